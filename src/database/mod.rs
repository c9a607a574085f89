// Vector store backed by SQLite


pub mod sqlite;
pub mod vector;

pub use sqlite::*;

use thiserror::Error;

/// Primary SQLite result codes that mean another connection holds the lock
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Extended result codes carry the primary code in the low byte
fn is_lock_contention(error: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = error else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Embedding has {actual} dimensions but the store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding dimension must be greater than 0")]
    InvalidDimension,

    #[error("Vector schema has not been created; ingest a document first")]
    SchemaMissing,

    #[error("Invalid k: {0} (must be at least 1)")]
    InvalidK(usize),

    #[error("Store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("Store query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    #[inline]
    fn from(error: sqlx::Error) -> Self {
        if is_lock_contention(&error)
            || matches!(
                error,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            )
        {
            Self::Unavailable(error)
        } else {
            Self::Query(error)
        }
    }
}

impl StoreError {
    /// Lock contention and connection failures may clear up on retry
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
