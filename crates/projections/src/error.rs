//! Read-model repository error types.

use common::{AggregateError, AggregateId, UnknownMimeType};
use thiserror::Error;

/// Errors that can occur when reading or writing the read models.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An item that had to exist was not found.
    #[error("Item not found: {0}")]
    ItemNotFound(AggregateId),

    /// A collection that had to exist was not found.
    #[error("Collection not found: {0}")]
    CollectionNotFound(AggregateId),

    /// A collection name failed validation.
    #[error(
        "Invalid collection name {0:?}: must be 1-50 letters, numbers, spaces, hyphens or underscores"
    )]
    InvalidCollectionName(String),

    /// Another collection already uses the name.
    #[error("A collection named {0:?} already exists")]
    CollectionNameTaken(String),

    /// Every suffixed variant of a name is already taken.
    #[error("Could not find a free name for collection {0:?}")]
    NameSuffixExhausted(String),

    /// A stored row holds an invalid identifier.
    #[error("Corrupt row: {0}")]
    InvalidIdentifier(#[from] AggregateError),

    /// A stored row holds an unsupported mimetype.
    #[error("Corrupt row: {0}")]
    InvalidMimeType(#[from] UnknownMimeType),
}

impl RepositoryError {
    /// Returns true if the error is a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RepositoryError::Database(sqlx::Error::Database(db_err)) => {
                db_err.is_unique_violation()
            }
            _ => false,
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
