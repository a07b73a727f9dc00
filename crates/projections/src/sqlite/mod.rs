//! SQLite implementations of the repository contracts.

mod collections;
mod items;

pub use collections::SqliteCollectionRepository;
pub use items::SqliteItemRepository;

use common::AggregateId;

fn scope(collection_id: Option<AggregateId>) -> Option<String> {
    collection_id.map(|id| id.to_string())
}
