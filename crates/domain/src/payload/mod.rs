//! The closed set of clipboard payloads.

mod collection;
mod item;

pub use collection::{CreateCollection, DeleteCollection, RenameCollection};
pub use item::{BumpItem, CreateItem, DeleteItem};

use async_trait::async_trait;
use common::{AggregateId, AggregateType, MimeType};
use event_store::{Payload, ProjectionOptions};
use projections::Repository;
use sqlx::{Sqlite, Transaction};

use crate::{Action, PayloadError};

/// Every mutation the vault records in its event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPayload {
    CreateItem(CreateItem),
    BumpItem(BumpItem),
    DeleteItem(DeleteItem),
    CreateCollection(CreateCollection),
    RenameCollection(RenameCollection),
    DeleteCollection(DeleteCollection),
}

impl ClipboardPayload {
    pub fn create_item(
        content: impl Into<Vec<u8>>,
        mimetype: MimeType,
        collection_id: Option<AggregateId>,
    ) -> Self {
        Self::CreateItem(CreateItem {
            content: content.into(),
            mimetype,
            collection_id,
        })
    }

    pub fn bump_item() -> Self {
        Self::BumpItem(BumpItem {})
    }

    pub fn delete_item() -> Self {
        Self::DeleteItem(DeleteItem {})
    }

    pub fn create_collection(name: impl Into<String>) -> Self {
        Self::CreateCollection(CreateCollection { name: name.into() })
    }

    pub fn rename_collection(new_name: impl Into<String>) -> Self {
        Self::RenameCollection(RenameCollection {
            new_name: new_name.into(),
        })
    }

    pub fn delete_collection() -> Self {
        Self::DeleteCollection(DeleteCollection {})
    }

    /// Returns the tag this payload is stored under.
    pub fn kind(&self) -> Action {
        match self {
            ClipboardPayload::CreateItem(_) => Action::CreateItem,
            ClipboardPayload::BumpItem(_) => Action::BumpItem,
            ClipboardPayload::DeleteItem(_) => Action::DeleteItem,
            ClipboardPayload::CreateCollection(_) => Action::CreateCollection,
            ClipboardPayload::RenameCollection(_) => Action::RenameCollection,
            ClipboardPayload::DeleteCollection(_) => Action::DeleteCollection,
        }
    }
}

#[async_trait]
impl Payload for ClipboardPayload {
    type Repository = Repository;
    type Error = PayloadError;

    fn action(&self) -> &'static str {
        self.kind().as_str()
    }

    fn encode(&self) -> event_store::Result<Vec<u8>> {
        let raw = match self {
            ClipboardPayload::CreateItem(p) => serde_json::to_vec(p)?,
            ClipboardPayload::BumpItem(p) => serde_json::to_vec(p)?,
            ClipboardPayload::DeleteItem(p) => serde_json::to_vec(p)?,
            ClipboardPayload::CreateCollection(p) => serde_json::to_vec(p)?,
            ClipboardPayload::RenameCollection(p) => serde_json::to_vec(p)?,
            ClipboardPayload::DeleteCollection(p) => serde_json::to_vec(p)?,
        };
        Ok(raw)
    }

    fn decode(raw: &[u8], action: &str) -> event_store::Result<Self> {
        let payload = match action.parse::<Action>()? {
            Action::CreateItem => Self::CreateItem(serde_json::from_slice(raw)?),
            Action::BumpItem => Self::BumpItem(serde_json::from_slice(raw)?),
            Action::DeleteItem => Self::DeleteItem(serde_json::from_slice(raw)?),
            Action::CreateCollection => Self::CreateCollection(serde_json::from_slice(raw)?),
            Action::RenameCollection => Self::RenameCollection(serde_json::from_slice(raw)?),
            Action::DeleteCollection => Self::DeleteCollection(serde_json::from_slice(raw)?),
        };
        Ok(payload)
    }

    #[tracing::instrument(skip(self, tx, repository), fields(action = self.action(), aggregate = %options.aggregate, sequence = %options.sequence))]
    async fn apply_projection(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
        options: ProjectionOptions,
    ) -> Result<(), PayloadError> {
        match self {
            ClipboardPayload::CreateItem(p) => p.project(tx, repository, options).await,
            ClipboardPayload::BumpItem(p) => p.project(tx, repository, options).await,
            ClipboardPayload::DeleteItem(p) => p.project(tx, repository, options).await,
            ClipboardPayload::CreateCollection(p) => p.project(tx, repository, options).await,
            ClipboardPayload::RenameCollection(p) => p.project(tx, repository, options).await,
            ClipboardPayload::DeleteCollection(p) => p.project(tx, repository, options).await,
        }
    }

    async fn reset_projections(
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
    ) -> Result<(), PayloadError> {
        let items = repository.items().delete_all(tx).await?;
        let collections = repository.collections().delete_all(tx).await?;
        tracing::info!(items, collections, "read models cleared");
        Ok(())
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ClipboardPayload {
                fn from(payload: $variant) -> Self {
                    ClipboardPayload::$variant(payload)
                }
            }
        )*
    };
}

impl_from_payload!(
    CreateItem,
    BumpItem,
    DeleteItem,
    CreateCollection,
    RenameCollection,
    DeleteCollection,
);

fn ensure_aggregate_type(
    action: Action,
    expected: AggregateType,
    options: ProjectionOptions,
) -> crate::Result<()> {
    let actual = options.aggregate.aggregate_type();
    if actual != expected {
        return Err(PayloadError::WrongAggregateType {
            action,
            expected,
            actual,
        });
    }
    Ok(())
}
