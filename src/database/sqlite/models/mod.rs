
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use crate::database::vector::decode_embedding;

/// A chunk ready to be written, embedding included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChunk {
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A stored chunk joined with its vector; `embedding` is little-endian `f32` bytes
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredChunk {
    pub id: i64,
    pub doc_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<u8>,
    pub created_at: NaiveDateTime,
}

impl StoredChunk {
    #[inline]
    pub fn vector(&self) -> Option<Vec<f32>> {
        decode_embedding(&self.embedding)
    }
}

/// One similarity search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub doc_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub chunk_count: i64,
    pub ingested_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean distance
    #[default]
    L2,
}

impl std::fmt::Display for DistanceMetric {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DistanceMetric::L2 => write!(f, "l2"),
        }
    }
}

/// Registered `vec0` similarity index over the embedding column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VectorIndex {
    pub name: String,
    pub table_name: String,
    pub column_name: String,
    pub dimension: i64,
    pub metric: DistanceMetric,
    pub created_at: NaiveDateTime,
}
