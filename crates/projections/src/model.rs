//! Read-model rows.

use chrono::{DateTime, Utc};
use common::{AggregateId, MimeType};
use event_store::Sequence;
use serde::Serialize;

/// A stored clipboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Same as the item aggregate's ID.
    pub id: AggregateId,
    pub content: Vec<u8>,
    /// Hex SHA-256 of `content`.
    pub hash: String,
    pub mimetype: MimeType,
    /// Sequence of the last event that created or bumped this item.
    pub last_applied_sequence_id: Sequence,
    pub collection_id: Option<AggregateId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert an item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub id: AggregateId,
    pub content: Vec<u8>,
    pub hash: String,
    pub mimetype: MimeType,
    pub collection_id: Option<AggregateId>,
    pub sequence: Sequence,
    pub created_at: DateTime<Utc>,
}

/// A named group of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection {
    /// Same as the collection aggregate's ID.
    pub id: AggregateId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A collection together with the number of items it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    #[serde(flatten)]
    pub collection: Collection,
    pub items_count: i64,
}
