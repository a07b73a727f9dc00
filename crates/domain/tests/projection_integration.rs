//! Integration tests: clipboard payloads → EventManager → item and collection read models.

use std::sync::Arc;

use chrono::Utc;
use common::{Aggregate, AggregateId, AggregateType, MimeType, checksum};
use domain::{ClipboardEventManager, ClipboardPayload, PayloadError};
use event_store::{AppendOptions, EventEnvelope, EventManager, EventStoreError, Version, database};
use projections::naming::name_candidates;
use projections::{Collection, Item, RepositoryError, Repository};

async fn setup() -> ClipboardEventManager {
    let pool = database::connect_in_memory().await.unwrap();
    EventManager::new(pool, Arc::new(Repository::sqlite()))
}

async fn apply(
    manager: &ClipboardEventManager,
    aggregate: Aggregate,
    payload: ClipboardPayload,
) -> Result<(event_store::EventRecord, Version), EventStoreError> {
    manager
        .apply(EventEnvelope::new(aggregate, payload), AppendOptions::new())
        .await
}

async fn find_item(manager: &ClipboardEventManager, aggregate: Aggregate) -> Option<Item> {
    let mut conn = manager.pool().acquire().await.unwrap();
    manager
        .repository()
        .items()
        .find_by_id(&mut conn, aggregate.id())
        .await
        .unwrap()
}

async fn find_collection(
    manager: &ClipboardEventManager,
    aggregate: Aggregate,
) -> Option<Collection> {
    let mut conn = manager.pool().acquire().await.unwrap();
    manager
        .repository()
        .collections()
        .find_by_id(&mut conn, aggregate.id())
        .await
        .unwrap()
}

fn payload_error(err: &EventStoreError) -> &PayloadError {
    err.projection_source::<PayloadError>()
        .expect("projection failure")
}

#[tokio::test]
async fn create_item_projects_row_with_sequence() {
    let manager = setup().await;
    let item = Aggregate::new(AggregateType::Item);

    let (record, version) = apply(
        &manager,
        item,
        ClipboardPayload::create_item(b"hello".to_vec(), MimeType::TextPlain, None),
    )
    .await
    .unwrap();

    assert_eq!(version, Version::first());
    assert_eq!(record.action, "create_item");

    let row = find_item(&manager, item).await.unwrap();
    assert_eq!(row.content, b"hello");
    assert_eq!(row.hash, checksum(b"hello"));
    assert_eq!(row.last_applied_sequence_id, record.sequence);
    assert_eq!(row.created_at, record.occurred_at);
}

#[tokio::test]
async fn bump_updates_recency_only() {
    let manager = setup().await;
    let item = Aggregate::new(AggregateType::Item);

    apply(
        &manager,
        item,
        ClipboardPayload::create_item(b"same".to_vec(), MimeType::TextPlain, None),
    )
    .await
    .unwrap();
    let (bump, version) = apply(&manager, item, ClipboardPayload::bump_item())
        .await
        .unwrap();

    assert_eq!(version, Version::new(2));
    let row = find_item(&manager, item).await.unwrap();
    assert_eq!(row.last_applied_sequence_id, bump.sequence);
    assert_eq!(row.content, b"same");
    assert_eq!(row.updated_at, bump.occurred_at);
}

#[tokio::test]
async fn bump_missing_item_rolls_back() {
    let manager = setup().await;
    let item = Aggregate::new(AggregateType::Item);

    let err = apply(&manager, item, ClipboardPayload::bump_item())
        .await
        .unwrap_err();

    assert!(matches!(
        payload_error(&err),
        PayloadError::Repository(RepositoryError::ItemNotFound(id)) if *id == item.id()
    ));
    assert!(manager.events_for_aggregate(item).await.unwrap().is_empty());
}

#[tokio::test]
async fn payload_rejects_wrong_aggregate_type() {
    let manager = setup().await;
    let collection = Aggregate::new(AggregateType::Collection);

    let err = apply(&manager, collection, ClipboardPayload::delete_item())
        .await
        .unwrap_err();

    assert!(matches!(
        payload_error(&err),
        PayloadError::WrongAggregateType {
            expected: AggregateType::Item,
            actual: AggregateType::Collection,
            ..
        }
    ));
}

#[tokio::test]
async fn delete_item_removes_row() {
    let manager = setup().await;
    let item = Aggregate::new(AggregateType::Item);

    apply(
        &manager,
        item,
        ClipboardPayload::create_item(b"bye".to_vec(), MimeType::TextPlain, None),
    )
    .await
    .unwrap();
    apply(&manager, item, ClipboardPayload::delete_item())
        .await
        .unwrap();

    assert!(find_item(&manager, item).await.is_none());
    assert_eq!(manager.events_for_aggregate(item).await.unwrap().len(), 2);
}

#[tokio::test]
async fn create_collection_suffixes_taken_names() {
    let manager = setup().await;
    let first = Aggregate::new(AggregateType::Collection);
    let second = Aggregate::new(AggregateType::Collection);
    let third = Aggregate::new(AggregateType::Collection);

    for aggregate in [first, second, third] {
        apply(
            &manager,
            aggregate,
            ClipboardPayload::create_collection("Notes"),
        )
        .await
        .unwrap();
    }

    assert_eq!(find_collection(&manager, first).await.unwrap().name, "Notes");
    assert_eq!(
        find_collection(&manager, second).await.unwrap().name,
        "Notes 001"
    );
    assert_eq!(
        find_collection(&manager, third).await.unwrap().name,
        "Notes 002"
    );
}

/// Stores `name` and every `name NNN` variant directly in the read model.
async fn take_every_variant(manager: &ClipboardEventManager, name: &str) {
    let mut tx = manager.pool().begin().await.unwrap();
    for candidate in name_candidates(name) {
        let now = Utc::now();
        manager
            .repository()
            .collections()
            .create(
                &mut tx,
                Collection {
                    id: AggregateId::new(),
                    name: candidate,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn create_collection_fails_when_suffixes_run_out() {
    let manager = setup().await;
    take_every_variant(&manager, "Notes").await;
    let collection = Aggregate::new(AggregateType::Collection);

    let err = apply(
        &manager,
        collection,
        ClipboardPayload::create_collection("Notes"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        payload_error(&err),
        PayloadError::Repository(RepositoryError::NameSuffixExhausted(name)) if name == "Notes"
    ));
    assert!(find_collection(&manager, collection).await.is_none());
    assert!(manager.events_for_aggregate(collection).await.unwrap().is_empty());
    assert_eq!(
        manager.aggregate_version(collection).await.unwrap(),
        Version::initial()
    );
}

#[tokio::test]
async fn create_collection_replay_is_noop() {
    let manager = setup().await;
    let collection = Aggregate::new(AggregateType::Collection);

    apply(&manager, collection, ClipboardPayload::create_collection("Work"))
        .await
        .unwrap();
    let (_, version) = apply(
        &manager,
        collection,
        ClipboardPayload::create_collection("Other"),
    )
    .await
    .unwrap();

    assert_eq!(version, Version::new(2));
    assert_eq!(
        find_collection(&manager, collection).await.unwrap().name,
        "Work"
    );
}

#[tokio::test]
async fn rename_rejects_taken_and_invalid_names() {
    let manager = setup().await;
    let work = Aggregate::new(AggregateType::Collection);
    let home = Aggregate::new(AggregateType::Collection);

    apply(&manager, work, ClipboardPayload::create_collection("Work"))
        .await
        .unwrap();
    apply(&manager, home, ClipboardPayload::create_collection("Home"))
        .await
        .unwrap();

    let taken = apply(&manager, home, ClipboardPayload::rename_collection("work"))
        .await
        .unwrap_err();
    assert!(matches!(
        payload_error(&taken),
        PayloadError::Repository(RepositoryError::CollectionNameTaken(_))
    ));

    let invalid = apply(&manager, home, ClipboardPayload::rename_collection("no/slashes"))
        .await
        .unwrap_err();
    assert!(matches!(
        payload_error(&invalid),
        PayloadError::Repository(RepositoryError::InvalidCollectionName(_))
    ));

    apply(&manager, work, ClipboardPayload::rename_collection("WORK"))
        .await
        .unwrap();
    assert_eq!(find_collection(&manager, work).await.unwrap().name, "WORK");
    assert_eq!(manager.aggregate_version(home).await.unwrap(), Version::first());
}

#[tokio::test]
async fn delete_collection_removes_its_items() {
    let manager = setup().await;
    let collection = Aggregate::new(AggregateType::Collection);
    let inside = Aggregate::new(AggregateType::Item);
    let outside = Aggregate::new(AggregateType::Item);

    apply(&manager, collection, ClipboardPayload::create_collection("Temp"))
        .await
        .unwrap();
    apply(
        &manager,
        inside,
        ClipboardPayload::create_item(b"in".to_vec(), MimeType::TextPlain, Some(collection.id())),
    )
    .await
    .unwrap();
    apply(
        &manager,
        outside,
        ClipboardPayload::create_item(b"out".to_vec(), MimeType::TextPlain, None),
    )
    .await
    .unwrap();

    apply(&manager, collection, ClipboardPayload::delete_collection())
        .await
        .unwrap();

    assert!(find_collection(&manager, collection).await.is_none());
    assert!(find_item(&manager, inside).await.is_none());
    assert!(find_item(&manager, outside).await.is_some());
}

#[tokio::test]
async fn rebuild_reproduces_read_models() {
    let manager = setup().await;
    let collection = Aggregate::new(AggregateType::Collection);
    let kept = Aggregate::new(AggregateType::Item);
    let deleted = Aggregate::new(AggregateType::Item);

    apply(&manager, collection, ClipboardPayload::create_collection("Keep"))
        .await
        .unwrap();
    apply(&manager, collection, ClipboardPayload::rename_collection("Kept"))
        .await
        .unwrap();
    apply(
        &manager,
        kept,
        ClipboardPayload::create_item(b"a".to_vec(), MimeType::TextPlain, Some(collection.id())),
    )
    .await
    .unwrap();
    apply(&manager, kept, ClipboardPayload::bump_item())
        .await
        .unwrap();
    apply(
        &manager,
        deleted,
        ClipboardPayload::create_item(b"b".to_vec(), MimeType::TextPlain, None),
    )
    .await
    .unwrap();
    apply(&manager, deleted, ClipboardPayload::delete_item())
        .await
        .unwrap();

    let before_item = find_item(&manager, kept).await.unwrap();
    let before_collection = find_collection(&manager, collection).await.unwrap();

    let replayed = manager.rebuild_projections().await.unwrap();

    assert_eq!(replayed, 6);
    assert_eq!(find_item(&manager, kept).await.unwrap(), before_item);
    assert_eq!(
        find_collection(&manager, collection).await.unwrap(),
        before_collection
    );
    assert!(find_item(&manager, deleted).await.is_none());
}
