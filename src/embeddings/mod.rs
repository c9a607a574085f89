// Embedding and chat providers plus text chunking


pub mod chunking;
pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use chunking::{ChunkingConfig, ChunkingError, DocumentChunk, chunk_document, split_text};
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use provider::{ChatMessage, ChatProvider, EmbeddingProvider, ProviderError, Role};

use crate::config::{Config, ConfigError, ProviderKind};

/// The embedding and chat capabilities selected by the configuration
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatProvider>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("embedder", &format_args!("{}:{}", self.embedder.name(), self.embedder.model()))
            .field("chat", &format_args!("{}:{}", self.chat.name(), self.chat.model()))
            .finish()
    }
}

/// Build both capabilities for the configured provider.
///
/// Fails with [`ConfigError::MissingApiKey`] before any network activity when
/// a hosted provider has no credentials.
#[inline]
pub fn build_providers(config: &Config) -> Result<Providers, ConfigError> {
    let api_key = config.require_api_key()?;
    let settings = &config.provider;
    let timeout = Duration::from_secs(settings.timeout_seconds);

    let providers = match settings.kind {
        ProviderKind::OpenAi => {
            let client = OpenAiClient::new(
                &settings.openai,
                api_key.unwrap_or_default(),
                settings.batch_size,
                timeout,
            )?;
            Providers {
                embedder: Arc::new(client.clone()),
                chat: Arc::new(client),
            }
        }
        ProviderKind::Gemini => {
            let client = GeminiClient::new(
                &settings.gemini,
                api_key.unwrap_or_default(),
                settings.batch_size,
                timeout,
            )?;
            Providers {
                embedder: Arc::new(client.clone()),
                chat: Arc::new(client),
            }
        }
        ProviderKind::Ollama => {
            let client = OllamaClient::new(&settings.ollama, settings.batch_size, timeout)?;
            Providers {
                embedder: Arc::new(client.clone()),
                chat: Arc::new(client),
            }
        }
    };

    info!(
        "Using {} (embeddings: {}, chat: {})",
        settings.kind,
        providers.embedder.model(),
        providers.chat.model()
    );
    Ok(providers)
}
