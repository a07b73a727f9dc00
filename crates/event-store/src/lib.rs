//! Append-only event log with transactional projection.
//!
//! Events are stored in SQLite and projected into the read models by their
//! payloads inside the same transaction that appends them.

pub mod database;
pub mod error;
pub mod event;
pub mod manager;
pub mod payload;
pub mod store;

pub use common::{Aggregate, AggregateId, AggregateType};
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, EventRecord, Sequence, Version};
pub use manager::EventManager;
pub use payload::{Payload, ProjectionOptions};
pub use store::AppendOptions;
