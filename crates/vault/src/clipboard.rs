//! Copy and paste.

use common::{Aggregate, AggregateId, AggregateType, MimeType, checksum};
use domain::{ClipboardPayload, PayloadError};
use event_store::{AppendOptions, EventEnvelope, EventStoreError};
use projections::Item;

use crate::{Result, Vault, VaultError};

/// Options for [`Clipboard::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Overrides the configured passthrough setting.
    pub passthrough: Option<bool>,
    /// Falls back to the configured default collection.
    pub collection_id: Option<AggregateId>,
    pub mimetype: MimeType,
}

/// Options for [`Clipboard::get`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteOptions {
    /// Paste this item instead of the most recent one.
    pub item_id: Option<AggregateId>,
    /// Falls back to the configured default collection.
    pub collection_id: Option<AggregateId>,
    /// Read the system clipboard instead of the vault.
    pub from_system_clipboard: bool,
    /// Delete the item once it has been read.
    pub delete_after_paste: bool,
    /// Skip verifying that the collection exists.
    pub skip_collection_check: bool,
}

/// Pasted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteResult {
    /// `None` when read from the system clipboard.
    pub item_id: Option<AggregateId>,
    pub content: Vec<u8>,
    pub mimetype: MimeType,
    pub collection_id: Option<AggregateId>,
}

impl From<Item> for PasteResult {
    fn from(item: Item) -> Self {
        Self {
            item_id: Some(item.id),
            content: item.content,
            mimetype: item.mimetype,
            collection_id: item.collection_id,
        }
    }
}

/// Copy/paste operations on a [`Vault`].
pub struct Clipboard<'a> {
    vault: &'a Vault,
}

impl<'a> Clipboard<'a> {
    pub(crate) fn new(vault: &'a Vault) -> Self {
        Self { vault }
    }

    /// Stores `data`, returning the ID of the item holding it.
    ///
    /// Content already stored in the same collection is bumped to the top
    /// instead of being stored twice.
    #[tracing::instrument(skip(self, data), fields(len = data.len()))]
    pub async fn set(&self, data: &[u8], options: CopyOptions) -> Result<AggregateId> {
        let passthrough = options
            .passthrough
            .unwrap_or(self.vault.config().clipboard_passthrough);
        let native = self.vault.native();
        if passthrough && native.available() {
            native.write(data).await?;
        }

        let collection_id = options
            .collection_id
            .or(self.vault.config().default_collection);
        if let Some(id) = collection_id {
            self.ensure_collection(id).await?;
        }

        let hash = checksum(data);
        if let Some(existing) = self.find_by_hash(&hash, collection_id).await? {
            self.bump(existing.id).await?;
            metrics::counter!("clipboard_copies_total", "outcome" => "bumped").increment(1);
            return Ok(existing.id);
        }

        let aggregate = Aggregate::new(AggregateType::Item);
        let payload = ClipboardPayload::create_item(data, options.mimetype, collection_id);
        match self
            .vault
            .manager()
            .apply(EventEnvelope::new(aggregate, payload), AppendOptions::new())
            .await
        {
            Ok(_) => {
                tracing::debug!(item = %aggregate.id(), %hash, "item stored");
                metrics::counter!("clipboard_copies_total", "outcome" => "created").increment(1);
                Ok(aggregate.id())
            }
            Err(err) if is_duplicate_content(&err) => {
                // A concurrent copy stored the same content first.
                let winner = self
                    .find_by_hash(&hash, collection_id)
                    .await?
                    .ok_or(VaultError::EventStore(err))?;
                self.bump(winner.id).await?;
                metrics::counter!("clipboard_copies_total", "outcome" => "bumped").increment(1);
                Ok(winner.id)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the requested or most recent item, `None` if there is none.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, options: PasteOptions) -> Result<Option<PasteResult>> {
        let native = self.vault.native();
        if options.from_system_clipboard && native.available() {
            let content = native.read().await?;
            return Ok(Some(PasteResult {
                item_id: None,
                content,
                mimetype: MimeType::default(),
                collection_id: None,
            }));
        }

        let collection_id = options
            .collection_id
            .or(self.vault.config().default_collection);
        if let Some(id) = collection_id
            && !options.skip_collection_check
        {
            self.ensure_collection(id).await?;
        }

        let item = {
            let mut conn = self.vault.pool().acquire().await?;
            let items = self.vault.repository().items();
            match (options.item_id, collection_id) {
                (Some(id), Some(collection)) => {
                    items.find_in_collection(&mut conn, id, collection).await?
                }
                (Some(id), None) => items.find_by_id(&mut conn, id).await?,
                (None, scope) => items.find_latest(&mut conn, scope).await?,
            }
        };

        let Some(item) = item else {
            return Ok(None);
        };

        if options.delete_after_paste {
            let aggregate = Aggregate::from_parts(AggregateType::Item, item.id);
            self.vault
                .manager()
                .apply(
                    EventEnvelope::new(aggregate, ClipboardPayload::delete_item()),
                    AppendOptions::new(),
                )
                .await?;
        }

        metrics::counter!("clipboard_pastes_total").increment(1);
        Ok(Some(item.into()))
    }

    /// Removes an item.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, item_id: AggregateId) -> Result<()> {
        let aggregate = Aggregate::from_parts(AggregateType::Item, item_id);
        self.vault
            .manager()
            .apply(
                EventEnvelope::new(aggregate, ClipboardPayload::delete_item()),
                AppendOptions::new(),
            )
            .await?;
        Ok(())
    }

    async fn bump(&self, item_id: AggregateId) -> Result<()> {
        let aggregate = Aggregate::from_parts(AggregateType::Item, item_id);
        self.vault
            .manager()
            .apply(
                EventEnvelope::new(aggregate, ClipboardPayload::bump_item()),
                AppendOptions::new(),
            )
            .await?;
        tracing::debug!(item = %item_id, "item bumped");
        Ok(())
    }

    async fn find_by_hash(
        &self,
        hash: &str,
        collection_id: Option<AggregateId>,
    ) -> Result<Option<Item>> {
        let mut conn = self.vault.pool().acquire().await?;
        Ok(self
            .vault
            .repository()
            .items()
            .find_by_hash(&mut conn, hash, collection_id)
            .await?)
    }

    async fn ensure_collection(&self, id: AggregateId) -> Result<()> {
        let mut conn = self.vault.pool().acquire().await?;
        let found = self
            .vault
            .repository()
            .collections()
            .find_by_id(&mut conn, id)
            .await?;
        match found {
            Some(_) => Ok(()),
            None => Err(VaultError::CollectionNotFound(id.to_string())),
        }
    }
}

fn is_duplicate_content(err: &EventStoreError) -> bool {
    err.projection_source::<PayloadError>()
        .is_some_and(PayloadError::is_unique_violation)
}
