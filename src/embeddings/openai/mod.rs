
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::http::JsonClient;
use super::provider::{ChatMessage, ChatProvider, EmbeddingProvider, ProviderError, Role};
use crate::config::{ConfigError, OpenAiConfig};

const PROVIDER: &str = "openai";

/// OpenAI embeddings and chat completions
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: JsonClient,
    base_url: Url,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    temperature: Option<f32>,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    role: Role,
    content: Option<String>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(
        config: &OpenAiConfig,
        api_key: &str,
        batch_size: u32,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| ConfigError::InvalidUrl(config.base_url.clone()))?;

        Ok(Self {
            http: JsonClient::new(PROVIDER, timeout),
            base_url,
            api_key: api_key.to_string(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            temperature: config.temperature,
            batch_size: batch_size.max(1) as usize,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("invalid endpoint: {e}")))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = self.endpoint("/v1/embeddings")?;
        let bearer = format!("Bearer {}", self.api_key);
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response: EmbeddingResponse =
            self.http
                .post(&url, &[("Authorization", bearer.as_str())], &request)?;

        if response.data.len() != texts.len() {
            return Err(ProviderError::malformed(
                PROVIDER,
                format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    response.data.len()
                ),
            ));
        }

        // The API documents `index`; do not rely on response order
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        if data.iter().enumerate().any(|(i, d)| d.index != i) {
            return Err(ProviderError::malformed(
                PROVIDER,
                "embedding indices do not match the request",
            ));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

impl EmbeddingProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if text.is_empty() {
            return Err(ProviderError::EmptyInput(PROVIDER));
        }

        let mut embeddings = self.embed_batch(&[text.to_string()])?;
        embeddings
            .pop()
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "no embedding returned"))
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.iter().any(String::is_empty) {
            return Err(ProviderError::EmptyInput(PROVIDER));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts", batch.len());
            embeddings.extend(self.embed_batch(batch)?);
        }
        Ok(embeddings)
    }
}

impl ChatProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.chat_model
    }

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        if messages.is_empty() {
            return Err(ProviderError::EmptyInput(PROVIDER));
        }

        let url = self.endpoint("/v1/chat/completions")?;
        let bearer = format!("Bearer {}", self.api_key);
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature: self.temperature,
        };

        let response: ChatResponse =
            self.http
                .post(&url, &[("Authorization", bearer.as_str())], &request)?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "response contained no message"))?;
        if message.role != Role::Assistant {
            return Err(ProviderError::malformed(
                PROVIDER,
                format!("reply came from the {} role", message.role.as_str()),
            ));
        }
        message
            .content
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "response contained no message"))
    }
}
