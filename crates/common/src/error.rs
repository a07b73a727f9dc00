//! Aggregate identity errors.

use thiserror::Error;

/// Errors raised while constructing or parsing an aggregate identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The type tag is not one of the known aggregate types.
    #[error("Invalid aggregate type: {0:?}")]
    InvalidAggregateType(String),

    /// The identifier is malformed or the nil value.
    #[error("Invalid aggregate ID: {0:?}")]
    InvalidAggregateId(String),

    /// The string form is not `type:id`.
    #[error("Invalid aggregate string: {0:?}")]
    InvalidAggregateString(String),
}
