use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use sqlx::{Row, Sqlite, SqliteConnection, Transaction, sqlite::SqliteRow};

use crate::{
    Collection, CollectionLookup, CollectionRepository, CollectionSummary, FindAllOptions,
    RepositoryError, Result,
};

const SELECT_COLLECTIONS: &str = "SELECT id, name, created_at, updated_at FROM collections";

/// Collections stored in the `collections` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteCollectionRepository;

fn row_to_collection(row: &SqliteRow) -> Result<Collection> {
    let id: String = row.try_get("id")?;

    Ok(Collection {
        id: AggregateId::parse(&id)?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_summary(row: SqliteRow) -> Result<CollectionSummary> {
    Ok(CollectionSummary {
        collection: row_to_collection(&row)?,
        items_count: row.try_get("items_count")?,
    })
}

fn build_find_all_query(options: &FindAllOptions) -> String {
    let mut sql = String::from(
        r#"
        SELECT id, name, created_at, updated_at,
            (SELECT COUNT(*) FROM items WHERE items.collection_id = collections.id) AS items_count
        FROM collections
        "#,
    );

    let mut terms: Vec<String> = options
        .order_by
        .iter()
        .map(|order| format!("{} {}", order.field.column(), order.direction.keyword()))
        .collect();
    if terms.is_empty() {
        terms.push("created_at ASC".to_string());
    }
    terms.push("id ASC".to_string());
    sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));

    if let Some(pagination) = options.pagination {
        let limit = if pagination.limit == 0 {
            -1
        } else {
            i64::from(pagination.limit)
        };
        sql.push_str(&format!(" LIMIT {limit} OFFSET {}", pagination.offset));
    }

    sql
}

#[async_trait]
impl CollectionRepository for SqliteCollectionRepository {
    async fn create(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection: Collection,
    ) -> Result<Collection> {
        sqlx::query(
            "INSERT INTO collections (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(collection.id.to_string())
        .bind(&collection.name)
        .bind(collection.created_at)
        .bind(collection.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(collection)
    }

    async fn rename(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: AggregateId,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE collections SET name = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(name)
            .bind(at)
            .bind(id.to_string())
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::CollectionNotFound(id));
        }
        Ok(())
    }

    async fn delete_by_id(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: AggregateId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM collections WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM collections")
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: AggregateId,
    ) -> Result<Option<Collection>> {
        sqlx::query(&format!("{SELECT_COLLECTIONS} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?
            .as_ref()
            .map(row_to_collection)
            .transpose()
    }

    async fn find_by_name(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<Collection>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        sqlx::query(&format!(
            "{SELECT_COLLECTIONS} WHERE name = ?1 COLLATE NOCASE LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(row_to_collection)
        .transpose()
    }

    async fn find_one(
        &self,
        conn: &mut SqliteConnection,
        lookup: CollectionLookup,
    ) -> Result<Option<Collection>> {
        let name = lookup
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        if lookup.id.is_none() && name.is_none() {
            return Ok(None);
        }

        sqlx::query(&format!(
            "{SELECT_COLLECTIONS} WHERE id = ?1 OR name = ?2 COLLATE NOCASE LIMIT 1"
        ))
        .bind(lookup.id.map(|id| id.to_string()))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(row_to_collection)
        .transpose()
    }

    async fn find_all(
        &self,
        conn: &mut SqliteConnection,
        options: FindAllOptions,
    ) -> Result<Vec<CollectionSummary>> {
        let sql = build_find_all_query(&options);
        tracing::trace!(%sql, "listing collections");

        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
        rows.into_iter().map(row_to_summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use event_store::database::connect_in_memory;
    use sqlx::SqlitePool;

    use super::*;
    use crate::{CollectionField, OrderBy, Pagination};

    fn collection(name: &str, created_at: DateTime<Utc>) -> Collection {
        Collection {
            id: AggregateId::new(),
            name: name.to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    async fn insert(pool: &SqlitePool, collection: Collection) -> Collection {
        let mut tx = pool.begin().await.unwrap();
        let collection = SqliteCollectionRepository
            .create(&mut tx, collection)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        collection
    }

    #[tokio::test]
    async fn names_are_unique_ignoring_case() {
        let pool = connect_in_memory().await.unwrap();
        insert(&pool, collection("Notes", Utc::now())).await;

        let mut tx = pool.begin().await.unwrap();
        let err = SqliteCollectionRepository
            .create(&mut tx, collection("notes", Utc::now()))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn find_by_name_ignores_case_and_whitespace() {
        let pool = connect_in_memory().await.unwrap();
        let created = insert(&pool, collection("Work", Utc::now())).await;

        let mut conn = pool.acquire().await.unwrap();
        let found = SqliteCollectionRepository
            .find_by_name(&mut conn, "  wORk ")
            .await
            .unwrap();
        assert_eq!(found, Some(created));
        assert_eq!(
            SqliteCollectionRepository
                .find_by_name(&mut conn, "   ")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn find_one_matches_id_or_name() {
        let pool = connect_in_memory().await.unwrap();
        let created = insert(&pool, collection("Links", Utc::now())).await;

        let mut conn = pool.acquire().await.unwrap();
        let repo = SqliteCollectionRepository;
        assert_eq!(
            repo.find_one(&mut conn, CollectionLookup::by_id(created.id))
                .await
                .unwrap()
                .map(|c| c.id),
            Some(created.id)
        );
        assert_eq!(
            repo.find_one(&mut conn, CollectionLookup::by_name("links"))
                .await
                .unwrap()
                .map(|c| c.id),
            Some(created.id)
        );
        assert_eq!(
            repo.find_one(&mut conn, CollectionLookup::default())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn available_name_appends_counter() {
        let pool = connect_in_memory().await.unwrap();
        let repo = SqliteCollectionRepository;

        {
            let mut conn = pool.acquire().await.unwrap();
            assert_eq!(repo.available_name(&mut conn, "Notes").await.unwrap(), "Notes");
        }

        insert(&pool, collection("Notes", Utc::now())).await;
        insert(&pool, collection("Notes 001", Utc::now())).await;

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(
            repo.available_name(&mut conn, "Notes").await.unwrap(),
            "Notes 002"
        );
    }

    #[tokio::test]
    async fn rename_missing_collection_fails() {
        let pool = connect_in_memory().await.unwrap();
        let missing = AggregateId::new();

        let mut tx = pool.begin().await.unwrap();
        let err = SqliteCollectionRepository
            .rename(&mut tx, missing, "Anything", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::CollectionNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn find_all_orders_and_pages() {
        let pool = connect_in_memory().await.unwrap();
        let base = Utc::now();
        let alpha = insert(&pool, collection("alpha", base)).await;
        let beta = insert(&pool, collection("Beta", base + Duration::seconds(1))).await;
        let gamma = insert(&pool, collection("gamma", base + Duration::seconds(2))).await;

        let mut conn = pool.acquire().await.unwrap();
        let repo = SqliteCollectionRepository;

        let by_default = repo
            .find_all(&mut conn, FindAllOptions::default())
            .await
            .unwrap();
        let ids: Vec<_> = by_default.iter().map(|s| s.collection.id).collect();
        assert_eq!(ids, vec![alpha.id, beta.id, gamma.id]);
        assert!(by_default.iter().all(|s| s.items_count == 0));

        let by_name_desc = repo
            .find_all(
                &mut conn,
                FindAllOptions {
                    order_by: vec![OrderBy::desc(CollectionField::Name)],
                    pagination: Some(Pagination {
                        limit: 2,
                        offset: 0,
                    }),
                },
            )
            .await
            .unwrap();
        let names: Vec<_> = by_name_desc
            .iter()
            .map(|s| s.collection.name.as_str())
            .collect();
        assert_eq!(names, vec!["gamma", "Beta"]);

        let offset_only = repo
            .find_all(
                &mut conn,
                FindAllOptions {
                    order_by: vec![OrderBy::asc(CollectionField::CreatedAt)],
                    pagination: Some(Pagination {
                        limit: 0,
                        offset: 2,
                    }),
                },
            )
            .await
            .unwrap();
        assert_eq!(offset_only.len(), 1);
        assert_eq!(offset_only[0].collection.id, gamma.id);
    }

    #[test]
    fn find_all_query_always_breaks_ties_by_id() {
        let sql = build_find_all_query(&FindAllOptions {
            order_by: vec![OrderBy::desc(CollectionField::ItemsCount)],
            pagination: None,
        });
        assert!(sql.contains("ORDER BY items_count DESC, id ASC"));
        assert!(!sql.contains("LIMIT"));
    }
}
