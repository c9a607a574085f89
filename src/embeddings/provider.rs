use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by an embedding or chat capability
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Could not reach {provider}: {message}")]
    Connectivity {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} rejected the request credentials (HTTP {status})")]
    Authentication { provider: &'static str, status: u16 },

    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Cannot send empty input to {0}")]
    EmptyInput(&'static str),
}

impl ProviderError {
    #[inline]
    pub fn malformed(provider: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            message: message.into(),
        }
    }

    /// Connectivity failures, rate limiting and server errors may succeed on retry
    #[inline]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connectivity { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Turns text into fixed-length vectors.
///
/// Calls block until the provider answers or the client timeout expires.
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Embed several texts, returning vectors in input order
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Produces an assistant reply for a conversation
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}
