// Ingestion and question answering on top of the vector store


pub mod prompt;

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub use prompt::{REFUSAL, SYSTEM_PROMPT, build_messages, build_prompt};

use crate::config::{Config, DocumentConfig};
use crate::database::{Database, NewChunk, SearchHit, StoreError};
use crate::document::{read_pdf, resolve_document_path};
use crate::embeddings::{
    ChatProvider, ChunkingConfig, EmbeddingProvider, ProviderError, Providers, build_providers,
    chunk_document,
};
use crate::{RagError, Result};

/// Outcome of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunks: usize,
    pub dimension: usize,
    /// Rows of a previous ingestion that were replaced
    pub replaced: u64,
}

/// A chat reply together with the chunks it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub context: Vec<SearchHit>,
}

pub struct RagPipeline {
    database: Database,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    chunking: ChunkingConfig,
    document: DocumentConfig,
    top_k: usize,
    expected_dimension: Option<usize>,
}

impl RagPipeline {
    #[inline]
    pub fn new(database: Database, providers: Providers, config: &Config) -> Self {
        Self {
            database,
            embedder: providers.embedder,
            chat: providers.chat,
            chunking: config.chunking,
            document: config.document.clone(),
            top_k: config.retrieval.top_k,
            expected_dimension: config.store.embedding_dimension,
        }
    }

    /// Build the providers and open the store described by `config`
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let providers = build_providers(config)?;
        let database = Database::initialize_from_config(config).await?;
        Ok(Self::new(database, providers, config))
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    async fn embed_many(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        let embeddings = tokio::task::spawn_blocking(move || embedder.embed_many(&texts))
            .await
            .map_err(|e| anyhow::anyhow!("Embedding task failed: {e}"))??;
        Ok(embeddings)
    }

    /// Chunk `text`, embed every chunk and replace the stored chunk set of
    /// `document_id` with the result
    #[inline]
    pub async fn ingest_text(&self, document_id: &str, text: &str) -> Result<IngestReport> {
        let chunks = chunk_document(text, &self.chunking)?;
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(document_id.to_string()));
        }

        info!(
            "Embedding {} chunks of '{}' with {}",
            chunks.len(),
            document_id,
            self.embedder.model()
        );
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embed_many(texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(ProviderError::malformed(
                self.embedder.name(),
                format!(
                    "requested {} embeddings, received {}",
                    chunks.len(),
                    embeddings.len()
                ),
            )
            .into());
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(StoreError::InvalidDimension.into());
        }
        if let Some(expected) = self.expected_dimension.filter(|&d| d != dimension) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: dimension,
            }
            .into());
        }

        self.database.ensure_schema(dimension).await?;

        let rows: Vec<NewChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| NewChunk {
                chunk_index: chunk.index as i64,
                content: chunk.content,
                embedding,
            })
            .collect();

        let replaced = self.database.replace_document(document_id, &rows).await?;

        Ok(IngestReport {
            document_id: document_id.to_string(),
            chunks: rows.len(),
            dimension,
            replaced,
        })
    }

    /// Ingest a PDF. `path` falls back to the configured document and
    /// `document_id` to the configured id, then to the file name.
    #[inline]
    pub async fn ingest_pdf(
        &self,
        path: Option<&Path>,
        document_id: Option<&str>,
    ) -> Result<IngestReport> {
        let path = resolve_document_path(path, &self.document)?;
        let extracted = read_pdf(&path).await?;

        let document_id = document_id
            .or(self.document.doc_id.as_deref())
            .unwrap_or(&extracted.document_id);

        if extracted.text.is_empty() {
            return Err(RagError::EmptyDocument(document_id.to_string()));
        }

        self.ingest_text(document_id, &extracted.text).await
    }

    /// The `k` chunks nearest to `question` (configured `top_k` when `None`).
    ///
    /// An empty result is an error: answering without context is never
    /// attempted.
    #[inline]
    pub async fn retrieve(&self, question: &str, k: Option<usize>) -> Result<Vec<SearchHit>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let k = k.unwrap_or(self.top_k);
        let mut embeddings = self.embed_many(vec![question.to_string()]).await?;
        let query = embeddings.pop().ok_or_else(|| {
            ProviderError::malformed(self.embedder.name(), "no embedding returned")
        })?;

        let hits = self.database.search_topk(&query, k).await?;
        if hits.is_empty() {
            return Err(RagError::NoContext);
        }

        debug!(
            "Retrieved {} chunks (closest distance {:.4})",
            hits.len(),
            hits[0].distance
        );
        Ok(hits)
    }

    /// Retrieve context for `question` and ask the chat model to answer from it
    #[inline]
    pub async fn answer(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        let context = self.retrieve(question, k).await?;
        let chunks: Vec<&str> = context.iter().map(|hit| hit.content.as_str()).collect();
        let messages = build_messages(&chunks, question.trim());

        let chat = Arc::clone(&self.chat);
        let text = tokio::task::spawn_blocking(move || chat.chat(&messages))
            .await
            .map_err(|e| anyhow::anyhow!("Chat task failed: {e}"))??;

        Ok(Answer { text, context })
    }
}
