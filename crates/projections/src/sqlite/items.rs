use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Sequence;
use sqlx::{Row, Sqlite, SqliteConnection, Transaction, sqlite::SqliteRow};

use super::scope;
use crate::{Item, ItemRepository, NewItem, RepositoryError, Result};

const SELECT_ITEMS: &str = r#"
    SELECT id, content, hash, mimetype, last_applied_sequence_id, collection_id, created_at, updated_at
    FROM items
"#;

/// Items stored in the `items` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteItemRepository;

fn row_to_item(row: SqliteRow) -> Result<Item> {
    let id: String = row.try_get("id")?;
    let mimetype: String = row.try_get("mimetype")?;
    let collection_id: Option<String> = row.try_get("collection_id")?;

    Ok(Item {
        id: AggregateId::parse(&id)?,
        content: row.try_get("content")?,
        hash: row.try_get("hash")?,
        mimetype: mimetype.parse()?,
        last_applied_sequence_id: Sequence::new(row.try_get("last_applied_sequence_id")?),
        collection_id: collection_id
            .as_deref()
            .map(AggregateId::parse)
            .transpose()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn create(&self, tx: &mut Transaction<'_, Sqlite>, item: NewItem) -> Result<Item> {
        sqlx::query(
            r#"
            INSERT INTO items (id, content, hash, mimetype, last_applied_sequence_id, collection_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.content)
        .bind(&item.hash)
        .bind(item.mimetype.as_str())
        .bind(item.sequence.as_i64())
        .bind(scope(item.collection_id))
        .bind(item.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(Item {
            id: item.id,
            content: item.content,
            hash: item.hash,
            mimetype: item.mimetype,
            last_applied_sequence_id: item.sequence,
            collection_id: item.collection_id,
            created_at: item.created_at,
            updated_at: item.created_at,
        })
    }

    async fn bump(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: AggregateId,
        sequence: Sequence,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE items SET last_applied_sequence_id = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(sequence.as_i64())
        .bind(at)
        .bind(id.to_string())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::ItemNotFound(id));
        }
        Ok(())
    }

    async fn delete_by_id(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: AggregateId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_collection(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection_id: AggregateId,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM items WHERE collection_id = ?1")
            .bind(collection_id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM items").execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: AggregateId,
    ) -> Result<Option<Item>> {
        sqlx::query(&format!("{SELECT_ITEMS} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?
            .map(row_to_item)
            .transpose()
    }

    async fn find_in_collection(
        &self,
        conn: &mut SqliteConnection,
        id: AggregateId,
        collection_id: AggregateId,
    ) -> Result<Option<Item>> {
        sqlx::query(&format!("{SELECT_ITEMS} WHERE id = ?1 AND collection_id = ?2"))
            .bind(id.to_string())
            .bind(collection_id.to_string())
            .fetch_optional(&mut *conn)
            .await?
            .map(row_to_item)
            .transpose()
    }

    async fn find_by_hash(
        &self,
        conn: &mut SqliteConnection,
        hash: &str,
        collection_id: Option<AggregateId>,
    ) -> Result<Option<Item>> {
        sqlx::query(&format!(
            "{SELECT_ITEMS} WHERE hash = ?1 AND collection_id IS ?2 LIMIT 1"
        ))
        .bind(hash)
        .bind(scope(collection_id))
        .fetch_optional(&mut *conn)
        .await?
        .map(row_to_item)
        .transpose()
    }

    async fn find_latest(
        &self,
        conn: &mut SqliteConnection,
        collection_id: Option<AggregateId>,
    ) -> Result<Option<Item>> {
        sqlx::query(&format!(
            "{SELECT_ITEMS} WHERE collection_id IS ?1 ORDER BY last_applied_sequence_id DESC, updated_at DESC LIMIT 1"
        ))
        .bind(scope(collection_id))
        .fetch_optional(&mut *conn)
        .await?
        .map(row_to_item)
        .transpose()
    }

    async fn count(
        &self,
        conn: &mut SqliteConnection,
        collection_id: Option<AggregateId>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE collection_id IS ?1")
            .bind(scope(collection_id))
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}
