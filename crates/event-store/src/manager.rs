//! Transactional append-and-project pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::Aggregate;
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};

use crate::{
    AppendOptions, EventEnvelope, EventId, EventRecord, EventStoreError, Payload,
    ProjectionOptions, Result, Sequence, Version,
};

/// Takes the write lock up front so concurrent writers wait on the busy
/// timeout instead of failing when a read snapshot cannot be upgraded.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

const SELECT_EVENTS: &str = r#"
    SELECT sequence, id, aggregate_type, aggregate_id, aggregate_version, action, payload, occurred_at
    FROM events
"#;

/// Appends events to aggregate streams and projects them into the read models.
///
/// Every append runs in a single transaction: the version check, the inserts
/// and all projections either commit together or not at all.
pub struct EventManager<P: Payload> {
    pool: SqlitePool,
    repository: Arc<P::Repository>,
}

impl<P: Payload> Clone for EventManager<P> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<P: Payload> EventManager<P> {
    /// Creates an event manager over a migrated pool.
    pub fn new(pool: SqlitePool, repository: Arc<P::Repository>) -> Self {
        Self { pool, repository }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Gets the repository handed to projections.
    pub fn repository(&self) -> &Arc<P::Repository> {
        &self.repository
    }

    /// Appends a single event. See [`EventManager::apply_n`].
    ///
    /// Fails with [`EventStoreError::NoEventApplied`] when nothing was
    /// persisted, e.g. because the event ID already exists.
    pub async fn apply(
        &self,
        event: EventEnvelope<P>,
        options: AppendOptions,
    ) -> Result<(EventRecord, Version)> {
        let aggregate = event.aggregate;
        let (mut records, version) = self.apply_n(aggregate, vec![event], options).await?;

        let record = records
            .pop()
            .ok_or(EventStoreError::NoEventApplied(aggregate))?;

        Ok((record, version))
    }

    /// Appends a batch of events to one aggregate and applies their projections.
    ///
    /// Each envelope is rebound to `aggregate`. Events whose ID already exists
    /// in the log are skipped without error and are not projected again.
    #[tracing::instrument(skip(self, events), fields(aggregate = %aggregate, count = events.len()))]
    pub async fn apply_n(
        &self,
        aggregate: Aggregate,
        events: Vec<EventEnvelope<P>>,
        options: AppendOptions,
    ) -> Result<(Vec<EventRecord>, Version)> {
        if events.is_empty() {
            return Err(EventStoreError::NoEventsToAppend);
        }

        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let current = current_version(&mut tx, aggregate).await?;
        if let Some(expected) = options.expected_version
            && expected != current
        {
            metrics::counter!("event_append_conflicts_total").increment(1);
            tracing::warn!(%expected, actual = %current, "version mismatch");
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate,
                expected,
                actual: current,
            });
        }

        let now = Utc::now();
        let mut inserted: i64 = 0;
        for event in &events {
            let version = current.advance(inserted + 1);
            let payload = event.payload.encode()?;

            let result = sqlx::query(
                r#"
                INSERT INTO events (id, aggregate_type, aggregate_id, aggregate_version, action, payload, occurred_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(event.id.to_string())
            .bind(aggregate.aggregate_type().as_str())
            .bind(aggregate.id().to_string())
            .bind(version.as_i64())
            .bind(event.action())
            .bind(payload)
            .bind(event.occurred_at.unwrap_or(now))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate,
                        expected: options.expected_version.unwrap_or(current),
                        actual: version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            if result.rows_affected() == 0 {
                metrics::counter!("events_skipped_duplicate_total").increment(1);
                tracing::debug!(event_id = %event.id, "event already recorded, skipping");
                continue;
            }
            inserted += 1;
        }

        let rows = sqlx::query(&format!(
            "{SELECT_EVENTS} WHERE aggregate_type = ?1 AND aggregate_id = ?2 AND aggregate_version > ?3 ORDER BY aggregate_version ASC"
        ))
        .bind(aggregate.aggregate_type().as_str())
        .bind(aggregate.id().to_string())
        .bind(current.as_i64())
        .fetch_all(&mut *tx)
        .await?;

        let records = rows
            .into_iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>>>()?;

        for record in &records {
            self.project(&mut tx, record).await?;
        }

        tx.commit().await?;

        let version = current.advance(inserted);
        metrics::counter!("events_appended_total").increment(records.len() as u64);
        tracing::debug!(%version, appended = records.len(), "events applied");

        Ok((records, version))
    }

    /// Returns every event of an aggregate in version order.
    pub async fn events_for_aggregate(&self, aggregate: Aggregate) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_EVENTS} WHERE aggregate_type = ?1 AND aggregate_id = ?2 ORDER BY aggregate_version ASC"
        ))
        .bind(aggregate.aggregate_type().as_str())
        .bind(aggregate.id().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    /// Returns up to `limit` events recorded after `after`, in log order.
    pub async fn events_after(&self, after: Sequence, limit: i64) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_EVENTS} WHERE sequence > ?1 ORDER BY sequence ASC LIMIT ?2"
        ))
        .bind(after.as_i64())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    /// Returns the current version of an aggregate, [`Version::initial`] if it
    /// has no events.
    pub async fn aggregate_version(&self, aggregate: Aggregate) -> Result<Version> {
        let mut conn = self.pool.acquire().await?;
        current_version(&mut conn, aggregate).await
    }

    /// Clears the read models and replays the whole log into them.
    ///
    /// Returns the number of events replayed.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_projections(&self) -> Result<u64> {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        P::reset_projections(&mut tx, &self.repository)
            .await
            .map_err(|e| EventStoreError::ProjectionReset(Box::new(e)))?;

        let rows = sqlx::query(&format!("{SELECT_EVENTS} ORDER BY sequence ASC"))
            .fetch_all(&mut *tx)
            .await?;

        let mut replayed: u64 = 0;
        for row in rows {
            let record = row_to_record(row)?;
            self.project(&mut tx, &record).await?;
            replayed += 1;
        }

        tx.commit().await?;

        metrics::counter!("projections_rebuilt_total").increment(1);
        tracing::info!(replayed, "projections rebuilt");

        Ok(replayed)
    }

    async fn project(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        record: &EventRecord,
    ) -> Result<()> {
        let payload = record.decode::<P>()?;
        let options = ProjectionOptions {
            aggregate: record.aggregate,
            sequence: record.sequence,
            occurred_at: record.occurred_at,
        };

        payload
            .apply_projection(tx, &self.repository, options)
            .await
            .map_err(|e| EventStoreError::Projection {
                action: record.action.clone(),
                aggregate: record.aggregate,
                source: Box::new(e),
            })?;

        metrics::counter!("projections_applied_total").increment(1);
        Ok(())
    }
}

async fn current_version(conn: &mut SqliteConnection, aggregate: Aggregate) -> Result<Version> {
    let version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(aggregate_version), 0) FROM events WHERE aggregate_type = ?1 AND aggregate_id = ?2",
    )
    .bind(aggregate.aggregate_type().as_str())
    .bind(aggregate.id().to_string())
    .fetch_one(conn)
    .await?;

    Ok(Version::new(version))
}

fn row_to_record(row: SqliteRow) -> Result<EventRecord> {
    let id: EventId = row.try_get::<String, _>("id")?.parse()?;

    let aggregate_type: String = row.try_get("aggregate_type")?;
    let aggregate_id: String = row.try_get("aggregate_id")?;
    let aggregate = Aggregate::with_id(aggregate_type.parse()?, &aggregate_id)?;

    Ok(EventRecord {
        id,
        sequence: Sequence::new(row.try_get("sequence")?),
        aggregate,
        version: Version::new(row.try_get("aggregate_version")?),
        action: row.try_get("action")?,
        payload: row.try_get("payload")?,
        occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use sqlx::{Sqlite, Transaction};

    use super::*;
    use common::AggregateType;
    use crate::database::connect_in_memory;

    #[derive(Default)]
    struct Counter {
        applied: AtomicUsize,
        resets: AtomicUsize,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("projection refused")]
    struct Refused;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        fail: bool,
    }

    #[async_trait]
    impl Payload for Note {
        type Repository = Counter;
        type Error = Refused;

        fn action(&self) -> &'static str {
            "note"
        }

        fn encode(&self) -> Result<Vec<u8>> {
            Ok(serde_json::to_vec(self)?)
        }

        fn decode(raw: &[u8], action: &str) -> Result<Self> {
            match action {
                "note" => Ok(serde_json::from_slice(raw)?),
                other => Err(EventStoreError::UnknownEventAction(other.to_string())),
            }
        }

        async fn apply_projection(
            &self,
            _tx: &mut Transaction<'_, Sqlite>,
            repository: &Counter,
            _options: ProjectionOptions,
        ) -> std::result::Result<(), Refused> {
            if self.fail {
                return Err(Refused);
            }
            repository.applied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn reset_projections(
            _tx: &mut Transaction<'_, Sqlite>,
            repository: &Counter,
        ) -> std::result::Result<(), Refused> {
            repository.resets.fetch_add(1, Ordering::SeqCst);
            repository.applied.store(0, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn manager() -> EventManager<Note> {
        let pool = connect_in_memory().await.unwrap();
        EventManager::new(pool, Arc::new(Counter::default()))
    }

    fn note(aggregate: Aggregate) -> EventEnvelope<Note> {
        EventEnvelope::new(aggregate, Note { fail: false })
    }

    #[tokio::test]
    async fn apply_assigns_first_version() {
        let manager = manager().await;
        let aggregate = Aggregate::new(AggregateType::Item);

        let (record, version) = manager
            .apply(note(aggregate), AppendOptions::new())
            .await
            .unwrap();

        assert_eq!(version, Version::first());
        assert_eq!(record.version, Version::first());
        assert_eq!(record.aggregate, aggregate);
        assert_eq!(record.action, "note");
        assert_eq!(manager.repository().applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn apply_n_assigns_consecutive_versions() {
        let manager = manager().await;
        let aggregate = Aggregate::new(AggregateType::Item);

        manager
            .apply(note(aggregate), AppendOptions::new())
            .await
            .unwrap();

        let (records, version) = manager
            .apply_n(
                aggregate,
                vec![note(aggregate), note(aggregate), note(aggregate)],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(4));
        let versions: Vec<i64> = records.iter().map(|r| r.version.as_i64()).collect();
        assert_eq!(versions, vec![2, 3, 4]);
        assert!(records.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[tokio::test]
    async fn apply_n_rejects_empty_batch() {
        let manager = manager().await;
        let result = manager
            .apply_n(
                Aggregate::new(AggregateType::Item),
                Vec::new(),
                AppendOptions::new(),
            )
            .await;

        assert!(matches!(result, Err(EventStoreError::NoEventsToAppend)));
    }

    #[tokio::test]
    async fn expected_version_mismatch_leaves_store_unchanged() {
        let manager = manager().await;
        let aggregate = Aggregate::new(AggregateType::Collection);

        let (_, version) = manager
            .apply(note(aggregate), AppendOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let result = manager
            .apply(note(aggregate), AppendOptions::expect_new())
            .await;

        match result {
            Err(EventStoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::initial());
                assert_eq!(actual, Version::first());
            }
            other => panic!("expected concurrency conflict, got {other:?}"),
        }

        assert_eq!(
            manager.aggregate_version(aggregate).await.unwrap(),
            Version::first()
        );
        assert_eq!(manager.repository().applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_skipped() {
        let manager = manager().await;
        let aggregate = Aggregate::new(AggregateType::Item);
        let event = note(aggregate);
        let id = event.id;

        manager
            .apply(event.clone(), AppendOptions::new())
            .await
            .unwrap();

        let replay = manager.apply(event, AppendOptions::new()).await;
        assert!(matches!(replay, Err(EventStoreError::NoEventApplied(a)) if a == aggregate));

        let (records, version) = manager
            .apply_n(
                aggregate,
                vec![note(aggregate).with_id(id), note(aggregate)],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(version, Version::new(2));
        assert_eq!(manager.events_for_aggregate(aggregate).await.unwrap().len(), 2);
        assert_eq!(manager.repository().applied.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_projection_rolls_back_batch() {
        let manager = manager().await;
        let aggregate = Aggregate::new(AggregateType::Item);

        let result = manager
            .apply_n(
                aggregate,
                vec![
                    note(aggregate),
                    EventEnvelope::new(aggregate, Note { fail: true }),
                ],
                AppendOptions::new(),
            )
            .await;

        let err = result.unwrap_err();
        assert!(err.projection_source::<Refused>().is_some());
        assert!(manager.events_for_aggregate(aggregate).await.unwrap().is_empty());
        assert_eq!(
            manager.aggregate_version(aggregate).await.unwrap(),
            Version::initial()
        );
    }

    #[tokio::test]
    async fn occurred_at_is_preserved_when_set() {
        let manager = manager().await;
        let aggregate = Aggregate::new(AggregateType::Item);
        let at = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let (record, _) = manager
            .apply(note(aggregate).occurred_at(at), AppendOptions::new())
            .await
            .unwrap();

        assert_eq!(record.occurred_at, at);
    }

    #[tokio::test]
    async fn events_after_pages_through_log() {
        let manager = manager().await;
        let first = Aggregate::new(AggregateType::Item);
        let second = Aggregate::new(AggregateType::Collection);

        manager.apply(note(first), AppendOptions::new()).await.unwrap();
        manager.apply(note(second), AppendOptions::new()).await.unwrap();
        manager.apply(note(first), AppendOptions::new()).await.unwrap();

        let page = manager.events_after(Sequence::new(0), 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].aggregate, second);

        let rest = manager.events_after(page[1].sequence, 10).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].version, Version::new(2));
    }

    #[tokio::test]
    async fn rebuild_replays_whole_log() {
        let manager = manager().await;
        for _ in 0..3 {
            manager
                .apply(note(Aggregate::new(AggregateType::Item)), AppendOptions::new())
                .await
                .unwrap();
        }

        let replayed = manager.rebuild_projections().await.unwrap();

        assert_eq!(replayed, 3);
        assert_eq!(manager.repository().resets.load(Ordering::SeqCst), 1);
        assert_eq!(manager.repository().applied.load(Ordering::SeqCst), 3);
    }
}
