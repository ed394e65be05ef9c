use crate::filter::FilterError;
use crate::query::QueryError;
use thiserror::Error;

/// Errors surfaced by [`crate::library::SongDb`] operations.
#[derive(Debug, Error)]
pub enum SongDbError {
    /// Malformed or unrecognized filter input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Reindex failed: {0:#}")]
    Indexing(anyhow::Error),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<FilterError> for SongDbError {
    fn from(e: FilterError) -> Self {
        SongDbError::Validation(e.to_string())
    }
}

impl From<QueryError> for SongDbError {
    fn from(e: QueryError) -> Self {
        SongDbError::Validation(e.to_string())
    }
}

pub type SongDbResult<T> = Result<T, SongDbError>;
