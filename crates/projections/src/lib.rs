//! Read models projected from the clipboard event log.
//!
//! This crate provides the query side of the vault:
//! - [`Item`] and [`Collection`] rows
//! - [`ItemRepository`] and [`CollectionRepository`] contracts with SQLite implementations
//! - collection name validation and collision suffixing in [`naming`]

pub mod error;
pub mod model;
pub mod naming;
pub mod repository;
pub mod sqlite;

pub use error::{RepositoryError, Result};
pub use model::{Collection, CollectionSummary, Item, NewItem};
pub use naming::{validate_collection_name, MAX_NAME_SUFFIX};
pub use repository::{
    CollectionField, CollectionLookup, CollectionRepository, Direction, FindAllOptions,
    ItemRepository, OrderBy, Pagination, Repository,
};
pub use sqlite::{SqliteCollectionRepository, SqliteItemRepository};
