#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::http::JsonClient;
use super::provider::{ChatMessage, ChatProvider, EmbeddingProvider, ProviderError};
use crate::config::{ConfigError, GeminiConfig};

const PROVIDER: &str = "gemini";
/// Upper bound on requests accepted by `batchEmbedContents`
const MAX_BATCH: usize = 100;

/// Google Gemini embeddings and content generation
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: JsonClient,
    base_url: Url,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini model resources are addressed as `models/<name>`
fn model_resource(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Gemini has no system/user message list for a single turn; flatten the
/// conversation into role-tagged blocks
#[inline]
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}:\n{}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl GeminiClient {
    #[inline]
    pub fn new(
        config: &GeminiConfig,
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
            embedding_model: model_resource(&config.embedding_model),
            chat_model: model_resource(&config.chat_model),
            batch_size: (batch_size.max(1) as usize).min(MAX_BATCH),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!("/v1beta/{model}:{method}"))
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("invalid endpoint: {e}")))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = self.endpoint(&self.embedding_model, "batchEmbedContents")?;
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.embedding_model,
                    content: Content {
                        role: None,
                        parts: [Part { text }],
                    },
                })
                .collect(),
        };

        let response: BatchEmbedResponse =
            self.http
                .post(&url, &[("x-goog-api-key", self.api_key.as_str())], &request)?;

        if response.embeddings.len() != texts.len() {
            return Err(ProviderError::malformed(
                PROVIDER,
                format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            ));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

impl EmbeddingProvider for GeminiClient {
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

        let url = self.endpoint(&self.embedding_model, "embedContent")?;
        let request = EmbedContentRequest {
            model: &self.embedding_model,
            content: Content {
                role: None,
                parts: [Part { text }],
            },
        };

        let response: EmbedContentResponse =
            self.http
                .post(&url, &[("x-goog-api-key", self.api_key.as_str())], &request)?;

        Ok(response.embedding.values)
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

impl ChatProvider for GeminiClient {
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

        let prompt = flatten_messages(messages);
        let url = self.endpoint(&self.chat_model, "generateContent")?;
        let request = GenerateContentRequest {
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: &prompt }],
            }],
        };

        let response: GenerateContentResponse =
            self.http
                .post(&url, &[("x-goog-api-key", self.api_key.as_str())], &request)?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "response contained no candidates"))?;

        Ok(text)
    }
}
