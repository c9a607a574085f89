#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("Invalid chunk size: {0} (must be greater than 0)")]
    InvalidSize(usize),
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    /// Position of this chunk within its document
    pub index: usize,
    /// The chunk text
    pub content: String,
}

/// Configuration for fixed-size sliding window chunking.
///
/// Sizes are measured in characters (Unicode scalar values), so a chunk never
/// splits a multi-byte character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Number of characters per chunk
    pub chunk_size: usize,
    /// Number of trailing characters repeated at the start of the next chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ChunkingError> {
        validate_window(self.chunk_size, self.chunk_overlap)
    }
}

fn validate_window(size: usize, overlap: usize) -> Result<(), ChunkingError> {
    if size == 0 {
        return Err(ChunkingError::InvalidSize(size));
    }
    if overlap >= size {
        return Err(ChunkingError::OverlapTooLarge { overlap, size });
    }
    Ok(())
}

/// Split `text` into windows of `size` characters, each starting `size - overlap`
/// characters after the previous one.
///
/// Empty input yields no chunks. The final chunk may be shorter than `size`.
#[inline]
#[expect(
    clippy::string_slice,
    reason = "slice bounds are taken from char_indices and always fall on char boundaries"
)]
pub fn split_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkingError> {
    validate_window(size, overlap)?;

    // Byte offset of every char start, plus the end of the string
    let boundaries = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect::<Vec<_>>();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(char_count / (size - overlap) + 1);
    let mut start = 0;
    while start < char_count {
        let end = (start + size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}

/// Chunk a whole document, numbering chunks from zero in document order
#[inline]
pub fn chunk_document(
    text: &str,
    config: &ChunkingConfig,
) -> Result<Vec<DocumentChunk>, ChunkingError> {
    let chunks = split_text(text, config.chunk_size, config.chunk_overlap)?
        .into_iter()
        .enumerate()
        .map(|(index, content)| DocumentChunk { index, content })
        .collect::<Vec<_>>();

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        text.chars().count(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}
