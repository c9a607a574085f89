
use super::models::*;
use crate::database::StoreError;
use crate::database::vector::encode_embedding;
use chrono::{NaiveDateTime, Utc};
use futures::TryStreamExt;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

pub const VECTOR_TABLE: &str = "rag_chunks_vec";
pub const EMBEDDING_COLUMN: &str = "embedding";
pub const VECTOR_INDEX_NAME: &str = "rag_chunks_embedding_l2";

/// Largest `k` a single `vec0` KNN query accepts
pub const MAX_K: usize = 4096;

const CREATE_INDEX_REGISTRY: &str = r#"
CREATE TABLE IF NOT EXISTS rag_vector_indexes (
    name TEXT PRIMARY KEY,
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    dimension INTEGER NOT NULL CHECK (dimension > 0),
    metric TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

const CREATE_CHUNK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS rag_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL CHECK (chunk_index >= 0),
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (doc_id, chunk_index)
)
"#;

/// `vec0` table holding one vector per chunk, keyed by the chunk row id
fn create_vector_table(dimension: usize) -> String {
    format!(
        r#"
CREATE VIRTUAL TABLE IF NOT EXISTS {VECTOR_TABLE} USING vec0(
    {EMBEDDING_COLUMN} float[{dimension}] distance_metric={metric}
)
"#,
        metric = DistanceMetric::L2
    )
}

pub struct SchemaQueries;

impl SchemaQueries {
    /// Create the index registry. Safe to run on every startup.
    #[inline]
    pub async fn bootstrap(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(CREATE_INDEX_REGISTRY).execute(pool).await?;
        Ok(())
    }

    /// Create the chunk table and its `vec0` similarity index for `dimension`,
    /// then register the index.
    ///
    /// Idempotent for the same dimension. A different dimension than the one
    /// already registered is rejected and nothing is changed.
    #[inline]
    pub async fn ensure(pool: &SqlitePool, dimension: usize) -> Result<VectorIndex, StoreError> {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension);
        }

        let mut tx = pool.begin().await?;

        sqlx::query(CREATE_CHUNK_TABLE).execute(&mut *tx).await?;
        sqlx::query(&create_vector_table(dimension))
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            "INSERT INTO rag_vector_indexes (name, table_name, column_name, dimension, metric, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(VECTOR_INDEX_NAME)
        .bind(VECTOR_TABLE)
        .bind(EMBEDDING_COLUMN)
        .bind(dimension as i64)
        .bind(DistanceMetric::L2)
        .bind(Utc::now().naive_utc())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let index = Self::get_index(&mut *tx)
            .await?
            .ok_or(StoreError::SchemaMissing)?;

        if index.dimension != dimension as i64 {
            warn!(
                "Refusing to change vector dimension from {} to {}",
                index.dimension, dimension
            );
            return Err(StoreError::DimensionMismatch {
                expected: index.dimension as usize,
                actual: dimension,
            });
        }

        tx.commit().await?;

        if inserted > 0 {
            debug!(
                "Created {} on {}.{} ({} dimensions, {})",
                index.name, index.table_name, index.column_name, index.dimension, index.metric
            );
        }
        Ok(index)
    }

    #[inline]
    pub async fn vector_index(pool: &SqlitePool) -> Result<Option<VectorIndex>, StoreError> {
        let mut conn = pool.acquire().await?;
        Self::get_index(&mut *conn).await
    }

    async fn get_index(conn: &mut SqliteConnection) -> Result<Option<VectorIndex>, StoreError> {
        let index = sqlx::query_as::<_, VectorIndex>(
            "SELECT name, table_name, column_name, dimension, metric, created_at
             FROM rag_vector_indexes WHERE name = ?",
        )
        .bind(VECTOR_INDEX_NAME)
        .fetch_optional(conn)
        .await?;

        Ok(index)
    }
}

pub struct ChunkQueries;

impl ChunkQueries {
    #[inline]
    pub async fn delete_document(
        conn: &mut SqliteConnection,
        doc_id: &str,
    ) -> Result<u64, StoreError> {
        // First statement must be a write so the transaction holds the write lock
        let ids = sqlx::query_scalar::<_, i64>(
            "DELETE FROM rag_chunks WHERE doc_id = ? RETURNING id",
        )
        .bind(doc_id)
        .fetch_all(&mut *conn)
        .await?;

        for id in &ids {
            sqlx::query("DELETE FROM rag_chunks_vec WHERE rowid = ?")
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(ids.len() as u64)
    }

    /// Insert the chunk row and its vector under the same row id
    #[inline]
    pub async fn insert(
        conn: &mut SqliteConnection,
        doc_id: &str,
        chunk: &NewChunk,
        created_at: NaiveDateTime,
    ) -> Result<i64, StoreError> {
        let id = sqlx::query(
            "INSERT INTO rag_chunks (doc_id, chunk_index, content, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(doc_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(created_at)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        sqlx::query("INSERT INTO rag_chunks_vec (rowid, embedding) VALUES (?, ?)")
            .bind(id)
            .bind(encode_embedding(&chunk.embedding))
            .execute(&mut *conn)
            .await?;

        Ok(id)
    }

    #[inline]
    pub async fn list_for_document(
        pool: &SqlitePool,
        doc_id: &str,
    ) -> Result<Vec<StoredChunk>, StoreError> {
        let chunks = sqlx::query_as::<_, StoredChunk>(
            "SELECT c.id, c.doc_id, c.chunk_index, c.content, v.embedding, c.created_at
             FROM rag_chunks c
             JOIN rag_chunks_vec v ON v.rowid = c.id
             WHERE c.doc_id = ?
             ORDER BY c.chunk_index",
        )
        .bind(doc_id)
        .fetch_all(pool)
        .await?;

        Ok(chunks)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool, doc_id: Option<&str>) -> Result<i64, StoreError> {
        let count = match doc_id {
            Some(doc_id) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rag_chunks WHERE doc_id = ?")
                    .bind(doc_id)
                    .fetch_one(pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rag_chunks")
                    .fetch_one(pool)
                    .await?
            }
        };

        Ok(count)
    }

    #[inline]
    pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<DocumentSummary>, StoreError> {
        let documents = sqlx::query_as::<_, DocumentSummary>(
            "SELECT doc_id, COUNT(*) AS chunk_count, MAX(created_at) AS ingested_at
             FROM rag_chunks GROUP BY doc_id ORDER BY doc_id",
        )
        .fetch_all(pool)
        .await?;

        Ok(documents)
    }

    /// KNN query against the `vec0` index, nearest first.
    ///
    /// `k` is capped at [`MAX_K`]. Equal distances are ordered by row id.
    /// Runs as a single read statement, so under WAL it sees one committed
    /// snapshot even while a replacement is in flight.
    #[inline]
    pub async fn nearest(
        pool: &SqlitePool,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let limit = k.min(MAX_K);
        if limit < k {
            debug!("Capping k from {} to {}", k, limit);
        }

        let hits: Vec<SearchHit> = sqlx::query_as::<_, (i64, String, i64, String, f64)>(
            "WITH knn AS (
                 SELECT rowid, distance FROM rag_chunks_vec
                 WHERE embedding MATCH ? AND k = ?
             )
             SELECT c.id, c.doc_id, c.chunk_index, c.content, knn.distance
             FROM knn
             JOIN rag_chunks c ON c.id = knn.rowid
             ORDER BY knn.distance, c.id",
        )
        .bind(encode_embedding(query))
        .bind(limit as i64)
        .fetch(pool)
        .map_ok(|(id, doc_id, chunk_index, content, distance)| SearchHit {
            id,
            doc_id,
            chunk_index,
            content,
            distance: distance as f32,
        })
        .try_collect()
        .await?;

        debug!("vec0 returned {} of {} requested neighbours", hits.len(), limit);
        Ok(hits)
    }

    /// Refresh planner statistics for the chunk table
    #[inline]
    pub async fn analyze(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query("ANALYZE rag_chunks").execute(pool).await?;
        Ok(())
    }
}
