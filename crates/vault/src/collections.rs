//! Collection management.

use common::{Aggregate, AggregateId, AggregateType};
use domain::ClipboardPayload;
use event_store::{AppendOptions, EventEnvelope};
use projections::{Collection, CollectionSummary, FindAllOptions, validate_collection_name};

use crate::{Result, Vault, VaultError};

/// The collection a [`Collections::create`] call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCollection {
    pub id: AggregateId,
    /// The stored name, suffixed if the requested one was taken.
    pub name: String,
}

/// Collection operations on a [`Vault`].
pub struct Collections<'a> {
    vault: &'a Vault,
}

impl<'a> Collections<'a> {
    pub(crate) fn new(vault: &'a Vault) -> Self {
        Self { vault }
    }

    /// Creates a collection.
    ///
    /// When `name` is taken, fails with [`VaultError::CollectionExists`] unless
    /// `append_suffix_if_exists` is set, in which case the first free
    /// `name NNN` variant is used.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, name: &str, append_suffix_if_exists: bool) -> Result<CreatedCollection> {
        let name = validate_collection_name(name)?;

        let name = {
            let mut conn = self.vault.pool().acquire().await?;
            let collections = self.vault.repository().collections();
            let existing = collections.find_by_name(&mut conn, &name).await?;
            match existing {
                None => name,
                Some(_) if append_suffix_if_exists => {
                    collections.available_name(&mut conn, &name).await?
                }
                Some(existing) => return Err(VaultError::CollectionExists(existing.name)),
            }
        };

        let aggregate = Aggregate::new(AggregateType::Collection);
        self.vault
            .manager()
            .apply(
                EventEnvelope::new(aggregate, ClipboardPayload::create_collection(name.as_str())),
                AppendOptions::new(),
            )
            .await?;

        // The projection resolves its own collisions, so read back what was stored.
        let stored = self.find(aggregate.id()).await?;
        let name = stored.map(|c| c.name).unwrap_or(name);
        tracing::info!(collection = %aggregate.id(), %name, "collection created");

        Ok(CreatedCollection {
            id: aggregate.id(),
            name,
        })
    }

    /// Deletes a collection together with its items.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: AggregateId) -> Result<()> {
        self.require(id).await?;

        let aggregate = Aggregate::from_parts(AggregateType::Collection, id);
        self.vault
            .manager()
            .apply(
                EventEnvelope::new(aggregate, ClipboardPayload::delete_collection()),
                AppendOptions::new(),
            )
            .await?;
        Ok(())
    }

    /// Renames a collection. Fails if another collection already has `new_name`.
    #[tracing::instrument(skip(self))]
    pub async fn rename(&self, id: AggregateId, new_name: &str) -> Result<()> {
        let new_name = validate_collection_name(new_name)?;

        {
            let mut conn = self.vault.pool().acquire().await?;
            let collections = self.vault.repository().collections();
            if collections.find_by_id(&mut conn, id).await?.is_none() {
                return Err(VaultError::CollectionNotFound(id.to_string()));
            }
            if let Some(other) = collections.find_by_name(&mut conn, &new_name).await?
                && other.id != id
            {
                return Err(VaultError::CollectionExists(other.name));
            }
        }

        let aggregate = Aggregate::from_parts(AggregateType::Collection, id);
        self.vault
            .manager()
            .apply(
                EventEnvelope::new(aggregate, ClipboardPayload::rename_collection(new_name)),
                AppendOptions::new(),
            )
            .await?;
        Ok(())
    }

    /// Lists collections with their item counts.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, options: FindAllOptions) -> Result<Vec<CollectionSummary>> {
        let mut conn = self.vault.pool().acquire().await?;
        Ok(self
            .vault
            .repository()
            .collections()
            .find_all(&mut conn, options)
            .await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find(&self, id: AggregateId) -> Result<Option<Collection>> {
        let mut conn = self.vault.pool().acquire().await?;
        Ok(self
            .vault
            .repository()
            .collections()
            .find_by_id(&mut conn, id)
            .await?)
    }

    /// Finds a collection by name, ignoring case.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Collection>> {
        let mut conn = self.vault.pool().acquire().await?;
        Ok(self
            .vault
            .repository()
            .collections()
            .find_by_name(&mut conn, name)
            .await?)
    }

    async fn require(&self, id: AggregateId) -> Result<Collection> {
        self.find(id)
            .await?
            .ok_or_else(|| VaultError::CollectionNotFound(id.to_string()))
    }
}
