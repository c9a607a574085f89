use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, StoreConfig};
use crate::database::StoreError;
use crate::database::vector::register_sqlite_vec;


pub mod models;
pub mod queries;

pub use models::*;
pub use queries::{ChunkQueries, MAX_K, SchemaQueries};

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(path: P, store: &StoreConfig) -> Result<Self, StoreError> {
        register_sqlite_vec();

        // WAL lets searches read a committed snapshot while a replacement is written
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(store.busy_timeout_seconds));

        let pool = SqlitePoolOptions::new()
            .max_connections(store.max_connections)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        SchemaQueries::bootstrap(&database.pool).await?;

        Ok(database)
    }

    /// Open the configured database file, creating its directory if needed
    #[inline]
    pub async fn initialize_from_config(config: &Config) -> crate::Result<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening vector store at {}", db_path.display());
        Ok(Self::new(&db_path, &config.store).await?)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Make sure the chunk table and its similarity index exist for `dimension`
    #[inline]
    pub async fn ensure_schema(&self, dimension: usize) -> Result<VectorIndex, StoreError> {
        SchemaQueries::ensure(&self.pool, dimension).await
    }

    #[inline]
    pub async fn vector_index(&self) -> Result<Option<VectorIndex>, StoreError> {
        SchemaQueries::vector_index(&self.pool).await
    }

    async fn require_index(&self) -> Result<VectorIndex, StoreError> {
        self.vector_index().await?.ok_or(StoreError::SchemaMissing)
    }

    /// Atomically swap the stored chunk set of `doc_id` for `chunks`.
    ///
    /// Every embedding is checked against the registered dimension before
    /// anything is written. The delete and all inserts share one transaction.
    /// Returns the number of rows that were replaced.
    #[inline]
    pub async fn replace_document(
        &self,
        doc_id: &str,
        chunks: &[NewChunk],
    ) -> Result<u64, StoreError> {
        let index = self.require_index().await?;
        let expected = index.dimension as usize;
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        let deleted = ChunkQueries::delete_document(&mut *tx, doc_id).await?;
        for chunk in chunks {
            ChunkQueries::insert(&mut *tx, doc_id, chunk, now).await?;
        }

        tx.commit().await?;
        info!(
            "Stored {} chunks for '{}' (replaced {})",
            chunks.len(),
            doc_id,
            deleted
        );

        if let Err(e) = self.analyze().await {
            warn!("Failed to refresh statistics after ingesting '{}': {}", doc_id, e);
        }

        Ok(deleted)
    }

    /// Remove every chunk of `doc_id`, returning how many were removed
    #[inline]
    pub async fn clear_document(&self, doc_id: &str) -> Result<u64, StoreError> {
        if self.vector_index().await?.is_none() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let deleted = ChunkQueries::delete_document(&mut *tx, doc_id).await?;
        tx.commit().await?;

        debug!("Cleared {} chunks for '{}'", deleted, doc_id);
        Ok(deleted)
    }

    /// The `k` stored chunks closest to `query`, nearest first
    #[inline]
    pub async fn search_topk(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError> {
        if k == 0 {
            return Err(StoreError::InvalidK(k));
        }

        let index = self.require_index().await?;
        let expected = index.dimension as usize;
        if query.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }

        ChunkQueries::nearest(&self.pool, query, k).await
    }

    #[inline]
    pub async fn count_chunks(&self, doc_id: Option<&str>) -> Result<i64, StoreError> {
        if self.vector_index().await?.is_none() {
            return Ok(0);
        }
        ChunkQueries::count(&self.pool, doc_id).await
    }

    #[inline]
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        if self.vector_index().await?.is_none() {
            return Ok(Vec::new());
        }
        ChunkQueries::list_documents(&self.pool).await
    }

    #[inline]
    pub async fn document_chunks(&self, doc_id: &str) -> Result<Vec<StoredChunk>, StoreError> {
        if self.vector_index().await?.is_none() {
            return Ok(Vec::new());
        }
        ChunkQueries::list_for_document(&self.pool, doc_id).await
    }

    /// Refresh table statistics so the query planner reflects the new row count
    #[inline]
    pub async fn analyze(&self) -> Result<(), StoreError> {
        ChunkQueries::analyze(&self.pool).await?;
        debug!("Chunk table statistics refreshed");
        Ok(())
    }
}
