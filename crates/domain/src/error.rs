//! Payload projection errors.

use common::AggregateType;
use projections::RepositoryError;
use thiserror::Error;

use crate::Action;

/// Errors raised while projecting a payload into the read models.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The event is bound to the wrong kind of aggregate.
    #[error("{action} expects a {expected} aggregate, got {actual}")]
    WrongAggregateType {
        action: Action,
        expected: AggregateType,
        actual: AggregateType,
    },

    /// The read models rejected the mutation.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PayloadError {
    /// Returns true if the mutation hit a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, PayloadError::Repository(e) if e.is_unique_violation())
    }
}

/// Result type for payload projections.
pub type Result<T> = std::result::Result<T, PayloadError>;
