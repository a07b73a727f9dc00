//! The payload/projection protocol.
//!
//! A payload is a typed mutation descriptor. The event manager only knows how
//! to encode it, decode it back from `(bytes, action)` and ask it to mutate
//! the read models inside the append transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Aggregate;
use sqlx::{Sqlite, Transaction};

use crate::{Result, Sequence};

/// Context handed to a payload when its event is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionOptions {
    /// The aggregate the event is bound to.
    pub aggregate: Aggregate,

    /// The event's global sequence.
    pub sequence: Sequence,

    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
}

/// A typed, encodable mutation of the read models.
#[async_trait]
pub trait Payload: Sized + Send + Sync {
    /// Read-model access handed to projections.
    type Repository: Send + Sync;

    /// Error raised by a failing projection.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the stable tag used for storage and dispatch.
    fn action(&self) -> &'static str;

    /// Encodes the payload body (without the action tag).
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decodes raw bytes into the payload selected by `action`.
    ///
    /// Fails with [`crate::EventStoreError::UnknownEventAction`] for an unknown tag.
    fn decode(raw: &[u8], action: &str) -> Result<Self>;

    /// Applies this payload's mutation to the read models.
    async fn apply_projection(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Self::Repository,
        options: ProjectionOptions,
    ) -> std::result::Result<(), Self::Error>;

    /// Clears every read model this payload family writes to.
    ///
    /// Called before a full replay of the log.
    async fn reset_projections(
        _tx: &mut Transaction<'_, Sqlite>,
        _repository: &Self::Repository,
    ) -> std::result::Result<(), Self::Error> {
        Ok(())
    }
}
