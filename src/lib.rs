use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::database::StoreError;
use crate::embeddings::ProviderError;
use crate::embeddings::chunking::ChunkingError;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("PDF extraction failed for {}: {message}", .path.display())]
    PdfExtraction { path: PathBuf, message: String },

    #[error("Document '{0}' produced no text to index")]
    EmptyDocument(String),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("No context was retrieved for the question; ingest a document first")]
    NoContext,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Whether retrying the same operation later could succeed
    #[inline]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_transient(),
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod rag;
