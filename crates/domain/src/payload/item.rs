//! Item payloads.

use common::{AggregateId, AggregateType, MimeType, checksum};
use event_store::ProjectionOptions;
use projections::{NewItem, Repository};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, Transaction};

use super::ensure_aggregate_type;
use crate::{Action, Result};

/// Stores new content as an item keyed by the event's aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    #[serde(with = "hex_content")]
    pub content: Vec<u8>,
    #[serde(default)]
    pub mimetype: MimeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<AggregateId>,
}

impl CreateItem {
    pub(crate) async fn project(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
        options: ProjectionOptions,
    ) -> Result<()> {
        ensure_aggregate_type(Action::CreateItem, AggregateType::Item, options)?;

        let item = repository
            .items()
            .create(
                tx,
                NewItem {
                    id: options.aggregate.id(),
                    content: self.content.clone(),
                    hash: checksum(&self.content),
                    mimetype: self.mimetype,
                    collection_id: self.collection_id,
                    sequence: options.sequence,
                    created_at: options.occurred_at,
                },
            )
            .await?;

        tracing::debug!(item = %item.id, hash = %item.hash, "item created");
        Ok(())
    }
}

/// Moves an existing item to the top without touching its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BumpItem {}

impl BumpItem {
    pub(crate) async fn project(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
        options: ProjectionOptions,
    ) -> Result<()> {
        ensure_aggregate_type(Action::BumpItem, AggregateType::Item, options)?;

        repository
            .items()
            .bump(
                tx,
                options.aggregate.id(),
                options.sequence,
                options.occurred_at,
            )
            .await?;
        Ok(())
    }
}

/// Removes an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItem {}

impl DeleteItem {
    pub(crate) async fn project(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository: &Repository,
        options: ProjectionOptions,
    ) -> Result<()> {
        ensure_aggregate_type(Action::DeleteItem, AggregateType::Item, options)?;

        let removed = repository
            .items()
            .delete_by_id(tx, options.aggregate.id())
            .await?;
        if !removed {
            tracing::debug!(item = %options.aggregate.id(), "item already gone");
        }
        Ok(())
    }
}

/// Content bytes are stored as a hex string.
mod hex_content {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_hex_encoded() {
        let payload = CreateItem {
            content: b"hi".to_vec(),
            mimetype: MimeType::TextPlain,
            collection_id: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["content"], "6869");
        assert_eq!(json["mimetype"], "text/plain");
        assert!(json.get("collection_id").is_none());
    }

    #[test]
    fn mimetype_defaults_when_missing() {
        let payload: CreateItem = serde_json::from_str(r#"{"content":"00ff"}"#).unwrap();
        assert_eq!(payload.content, vec![0x00, 0xff]);
        assert_eq!(payload.mimetype, MimeType::TextPlain);
    }

    #[test]
    fn invalid_hex_fails() {
        let result = serde_json::from_str::<CreateItem>(r#"{"content":"zz"}"#);
        assert!(result.is_err());
    }
}
