use common::{Aggregate, AggregateError};
use thiserror::Error;

use crate::Version;

/// Errors raised by the event log and the projections it drives.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The stream moved past the version the caller expected.
    #[error(
        "Concurrency conflict for aggregate {aggregate}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate: Aggregate,
        expected: Version,
        actual: Version,
    },

    /// An append was requested with an empty batch.
    #[error("No events to append")]
    NoEventsToAppend,

    /// A single-event append produced no persisted event.
    #[error("No event was applied for aggregate {0}")]
    NoEventApplied(Aggregate),

    /// The stored action tag does not map to a known payload.
    #[error("Unknown event action: {0:?}")]
    UnknownEventAction(String),

    /// A stored row carries a malformed event ID.
    #[error("Invalid event ID: {0:?}")]
    InvalidEventId(String),

    /// A stored row carries an invalid aggregate identity.
    #[error("Invalid aggregate: {0}")]
    InvalidAggregate(#[from] AggregateError),

    /// A payload failed to mutate the read models.
    #[error("Projection of {action} on {aggregate} failed: {source}")]
    Projection {
        action: String,
        aggregate: Aggregate,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Clearing the read models before a replay failed.
    #[error("Resetting projections failed: {0}")]
    ProjectionReset(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns the projection failure downcast to `E`, if this is one.
    pub fn projection_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            EventStoreError::Projection { source, .. } | EventStoreError::ProjectionReset(source) => {
                source.downcast_ref::<E>()
            }
            _ => None,
        }
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
