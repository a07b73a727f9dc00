//! Repository contracts for the read models.
//!
//! Mutations take the caller's transaction so they commit or roll back with
//! the event that caused them. Reads take any connection, including one
//! borrowed from an open transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Sequence;
use sqlx::{Sqlite, SqliteConnection, Transaction};

use crate::naming::name_candidates;
use crate::{Collection, CollectionSummary, Item, NewItem, RepositoryError, Result};

/// Access to the `items` read model.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Inserts a new item.
    async fn create(&self, tx: &mut Transaction<'_, Sqlite>, item: NewItem) -> Result<Item>;

    /// Marks an item as the most recently used one.
    ///
    /// Fails with [`RepositoryError::ItemNotFound`] if the item does not exist.
    async fn bump(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: AggregateId,
        sequence: Sequence,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Deletes an item, returning whether a row was removed.
    async fn delete_by_id(&self, tx: &mut Transaction<'_, Sqlite>, id: AggregateId)
    -> Result<bool>;

    /// Deletes every item in a collection, returning how many were removed.
    async fn delete_by_collection(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection_id: AggregateId,
    ) -> Result<u64>;

    /// Deletes every item.
    async fn delete_all(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<u64>;

    async fn find_by_id(&self, conn: &mut SqliteConnection, id: AggregateId)
    -> Result<Option<Item>>;

    /// Finds an item only if it belongs to `collection_id`.
    async fn find_in_collection(
        &self,
        conn: &mut SqliteConnection,
        id: AggregateId,
        collection_id: AggregateId,
    ) -> Result<Option<Item>>;

    /// Finds the item with the given content hash in a collection scope.
    ///
    /// `None` scopes the lookup to items outside any collection.
    async fn find_by_hash(
        &self,
        conn: &mut SqliteConnection,
        hash: &str,
        collection_id: Option<AggregateId>,
    ) -> Result<Option<Item>>;

    /// Finds the most recently created or bumped item in a collection scope.
    async fn find_latest(
        &self,
        conn: &mut SqliteConnection,
        collection_id: Option<AggregateId>,
    ) -> Result<Option<Item>>;

    /// Counts the items in a collection scope.
    async fn count(
        &self,
        conn: &mut SqliteConnection,
        collection_id: Option<AggregateId>,
    ) -> Result<i64>;
}

/// Access to the `collections` read model.
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Inserts a collection as-is. Name collisions surface as unique violations.
    async fn create(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection: Collection,
    ) -> Result<Collection>;

    /// Renames a collection.
    ///
    /// Fails with [`RepositoryError::CollectionNotFound`] if it does not exist.
    async fn rename(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: AggregateId,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Deletes a collection, returning whether a row was removed.
    async fn delete_by_id(&self, tx: &mut Transaction<'_, Sqlite>, id: AggregateId)
    -> Result<bool>;

    /// Deletes every collection.
    async fn delete_all(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<u64>;

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: AggregateId,
    ) -> Result<Option<Collection>>;

    /// Finds a collection by name, ignoring case and surrounding whitespace.
    async fn find_by_name(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<Collection>>;

    /// Finds the first collection matching either the ID or the name.
    async fn find_one(
        &self,
        conn: &mut SqliteConnection,
        lookup: CollectionLookup,
    ) -> Result<Option<Collection>>;

    /// Lists collections with their item counts.
    async fn find_all(
        &self,
        conn: &mut SqliteConnection,
        options: FindAllOptions,
    ) -> Result<Vec<CollectionSummary>>;

    /// Returns `name` if it is free, else the first free `name NNN` variant.
    ///
    /// Fails with [`RepositoryError::NameSuffixExhausted`] when every variant
    /// up to `name 999` is taken.
    async fn available_name(&self, conn: &mut SqliteConnection, name: &str) -> Result<String> {
        for candidate in name_candidates(name) {
            if self.find_by_name(&mut *conn, &candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(RepositoryError::NameSuffixExhausted(name.to_string()))
    }
}

/// Identifies a collection by ID, name, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionLookup {
    pub id: Option<AggregateId>,
    pub name: Option<String>,
}

impl CollectionLookup {
    pub fn by_id(id: AggregateId) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

/// Columns collections can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionField {
    Name,
    CreatedAt,
    UpdatedAt,
    ItemsCount,
}

impl CollectionField {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            CollectionField::Name => "name COLLATE NOCASE",
            CollectionField::CreatedAt => "created_at",
            CollectionField::UpdatedAt => "updated_at",
            CollectionField::ItemsCount => "items_count",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// A single `ORDER BY` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: CollectionField,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: CollectionField) -> Self {
        Self {
            field,
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: CollectionField) -> Self {
        Self {
            field,
            direction: Direction::Descending,
        }
    }
}

/// Limit/offset paging. A zero limit means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

/// Options for [`CollectionRepository::find_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindAllOptions {
    /// Applied in order. Empty means by creation time.
    pub order_by: Vec<OrderBy>,
    pub pagination: Option<Pagination>,
}

/// The read-model repositories handed to projections and facades.
#[derive(Clone)]
pub struct Repository {
    items: Arc<dyn ItemRepository>,
    collections: Arc<dyn CollectionRepository>,
}

impl Repository {
    pub fn new(items: Arc<dyn ItemRepository>, collections: Arc<dyn CollectionRepository>) -> Self {
        Self { items, collections }
    }

    /// Creates a repository backed by the SQLite implementations.
    pub fn sqlite() -> Self {
        Self::new(
            Arc::new(crate::sqlite::SqliteItemRepository),
            Arc::new(crate::sqlite::SqliteCollectionRepository),
        )
    }

    pub fn items(&self) -> &dyn ItemRepository {
        self.items.as_ref()
    }

    pub fn collections(&self) -> &dyn CollectionRepository {
        self.collections.as_ref()
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}
