#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::http::JsonClient;
use super::provider::{ChatMessage, ChatProvider, EmbeddingProvider, ProviderError, Role};
use crate::config::{ConfigError, OllamaConfig};

const PROVIDER: &str = "ollama";

/// Local Ollama server for both embeddings and chat
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: JsonClient,
    base_url: Url,
    embedding_model: String,
    chat_model: String,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    role: Role,
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDetails {
    pub format: Option<String>,
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(
        config: &OllamaConfig,
        batch_size: u32,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http: JsonClient::new(PROVIDER, timeout),
            base_url: config.ollama_url()?,
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            batch_size: batch_size.max(1) as usize,
        })
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("invalid endpoint: {e}")))
    }

    /// Test connection to the Ollama server and verify both models are pulled
    #[inline]
    pub fn health_check(&self) -> Result<(), ProviderError> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;
        for wanted in [&self.embedding_model, &self.chat_model] {
            Self::validate_model(&models, wanted)?;
        }

        info!(
            "Health check passed for Ollama server at {} with models {} and {}",
            self.base_url, self.embedding_model, self.chat_model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<(), ProviderError> {
        self.list_models().map(|_| ())
    }

    fn validate_model(models: &[ModelInfo], wanted: &str) -> Result<(), ProviderError> {
        if models.iter().any(|m| m.name == wanted) {
            debug!("Model {} is available", wanted);
            return Ok(());
        }

        let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        warn!(
            "Model {} not found. Available models: {:?}",
            wanted, available
        );
        Err(ProviderError::Api {
            provider: PROVIDER,
            status: 404,
            message: format!("model '{wanted}' is not available; available models: {available:?}"),
        })
    }

    /// List all models the server has pulled
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = self.endpoint("/api/tags")?;
        let response: ModelsResponse = self.http.get(&url, &[])?;

        debug!("Found {} models", response.models.len());
        Ok(response.models)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = self.endpoint("/api/embed")?;
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response: EmbedResponse = self.http.post(&url, &[], &request)?;

        if response.embeddings.len() != texts.len() {
            return Err(ProviderError::malformed(
                PROVIDER,
                format!(
                    "mismatch between request and response counts: {} vs {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            ));
        }

        Ok(response.embeddings)
    }
}

impl EmbeddingProvider for OllamaClient {
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

        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "no embedding returned"))
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.iter().any(String::is_empty) {
            return Err(ProviderError::EmptyInput(PROVIDER));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        // Process in batches to avoid overwhelming the server
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts", batch.len());
            embeddings.extend(self.embed_batch(batch)?);
        }
        Ok(embeddings)
    }
}

impl ChatProvider for OllamaClient {
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

        let url = self.endpoint("/api/chat")?;
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            stream: false,
        };

        let response: ChatResponse = self.http.post(&url, &[], &request)?;
        if response.message.role != Role::Assistant {
            return Err(ProviderError::malformed(
                PROVIDER,
                format!("reply came from the {} role", response.message.role.as_str()),
            ));
        }
        Ok(response.message.content)
    }
}
