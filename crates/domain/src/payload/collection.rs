//! Collection payloads.

use common::AggregateType;
use event_store::ProjectionOptions;
use projections::{Collection, RepositoryError, Repository, validate_collection_name};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, Transaction};

use super::ensure_aggregate_type;
use crate::{Action, Result};

/// Creates a collection keyed by the event's aggregate.
///
/// Replaying an event for an existing collection is a no-op. If another
/// collection already holds the name, the first free `name NNN` variant is
/// used so events recorded elsewhere still apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCollection {
    pub name: String,
}

impl CreateCollection {
    pub(crate) async fn project(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
        options: ProjectionOptions,
    ) -> Result<()> {
        ensure_aggregate_type(Action::CreateCollection, AggregateType::Collection, options)?;

        let collections = repository.collections();
        let id = options.aggregate.id();

        if collections.find_by_id(&mut **tx, id).await?.is_some() {
            tracing::debug!(collection = %id, "collection already exists, skipping");
            return Ok(());
        }

        let name = collections.available_name(&mut **tx, &self.name).await?;
        if name != self.name {
            tracing::info!(requested = %self.name, %name, "collection name taken, using suffix");
        }

        collections
            .create(
                tx,
                Collection {
                    id,
                    name,
                    created_at: options.occurred_at,
                    updated_at: options.occurred_at,
                },
            )
            .await?;
        Ok(())
    }
}

/// Gives a collection a new, unused name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCollection {
    pub new_name: String,
}

impl RenameCollection {
    pub(crate) async fn project(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
        options: ProjectionOptions,
    ) -> Result<()> {
        ensure_aggregate_type(Action::RenameCollection, AggregateType::Collection, options)?;

        let name = validate_collection_name(&self.new_name)?;
        let collections = repository.collections();
        let id = options.aggregate.id();

        if let Some(existing) = collections.find_by_name(&mut **tx, &name).await?
            && existing.id != id
        {
            return Err(RepositoryError::CollectionNameTaken(name).into());
        }

        collections
            .rename(tx, id, &name, options.occurred_at)
            .await?;
        Ok(())
    }
}

/// Removes a collection together with its items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCollection {}

impl DeleteCollection {
    pub(crate) async fn project(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
        options: ProjectionOptions,
    ) -> Result<()> {
        ensure_aggregate_type(Action::DeleteCollection, AggregateType::Collection, options)?;

        let id = options.aggregate.id();
        let items = repository.items().delete_by_collection(tx, id).await?;
        let removed = repository.collections().delete_by_id(tx, id).await?;

        tracing::debug!(collection = %id, items, removed, "collection deleted");
        Ok(())
    }
}
