//! Unit tests for the SQLite definitions storage
//!
//! These tests use an in-memory SQLite database for isolation.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::fixtures::*;
use maintenance_manager::clock::FakeClock;
use maintenance_manager::database::SqliteStorage;
use maintenance_manager::errors::StorageError;
use maintenance_manager::store::{Definitions, DefinitionsStorage, StoredDefinitions, WindowStore};
use maintenance_manager::target::Target;
use maintenance_manager::window::{MaintenanceWindow, RecurrenceSettings, RecurringWindowSpec};
use tempfile::TempDir;

fn sample_definitions() -> Definitions {
    let mut definitions = Definitions::default();
    definitions.insert_window(
        MaintenanceWindow::builder(base_time(), base_time() + minutes(30))
            .reason(reasons::KERNEL)
            .build(),
    );
    definitions.insert_recurring(
        RecurringWindowSpec::new("0 2 * * *", "1h", reasons::NIGHTLY, true, true, "15", "ops", None)
            .unwrap(),
    );
    definitions
}

#[tokio::test]
async fn test_write_and_read_definitions() {
    let db = TestDatabase::new().await.unwrap();
    let storage = db.storage();
    let key = Target::agent(agents::BUILD_1).key();

    assert!(storage.read(&key).await.unwrap().is_none());

    storage.write(&key, &sample_definitions()).await.unwrap();
    match storage.read(&key).await.unwrap() {
        Some(StoredDefinitions::Current(definitions)) => {
            assert_eq!(definitions.scheduled().len(), 1);
            assert_eq!(definitions.recurring().len(), 1);
            assert_eq!(definitions.recurring()[0].cron_expression(), "0 2 * * *");
        }
        other => panic!("unexpected record: {:?}", other),
    }
}

#[tokio::test]
async fn test_write_replaces_previous_record() {
    let db = TestDatabase::new().await.unwrap();
    let storage = db.storage();
    let key = Target::cloud(clouds::AWS).key();

    storage.write(&key, &sample_definitions()).await.unwrap();
    storage.write(&key, &Definitions::default()).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_definitions")
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
    match storage.read(&key).await.unwrap() {
        Some(StoredDefinitions::Current(definitions)) => assert!(definitions.is_empty()),
        other => panic!("unexpected record: {:?}", other),
    }
}

#[tokio::test]
async fn test_legacy_payload_reads_as_window_list() {
    let db = TestDatabase::new().await.unwrap();
    let storage = db.storage();
    let windows = vec![MaintenanceWindow::builder(base_time(), base_time() + minutes(30)).build()];

    sqlx::query(
        "INSERT INTO maintenance_definitions (target_key, payload, updated_at) VALUES (?, ?, ?)",
    )
    .bind("AGENT:build-01")
    .bind(serde_json::to_string(&windows).unwrap())
    .bind(chrono::Utc::now())
    .execute(storage.pool())
    .await
    .unwrap();

    match storage.read("AGENT:build-01").await.unwrap() {
        Some(StoredDefinitions::Legacy(legacy)) => assert_eq!(legacy.len(), 1),
        other => panic!("unexpected record: {:?}", other),
    }
}

#[tokio::test]
async fn test_corrupt_payload_is_a_serialization_error() {
    let db = TestDatabase::new().await.unwrap();
    let storage = db.storage();

    sqlx::query(
        "INSERT INTO maintenance_definitions (target_key, payload, updated_at) VALUES ('AGENT:x', 'not json', CURRENT_TIMESTAMP)",
    )
    .execute(storage.pool())
    .await
    .unwrap();

    let err = storage.read("AGENT:x").await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization { .. }));
}

#[tokio::test]
async fn test_keys_and_remove() {
    let db = TestDatabase::new().await.unwrap();
    let storage = db.storage();

    storage.write("CLOUD:aws", &Definitions::default()).await.unwrap();
    storage.write("AGENT:build-01", &Definitions::default()).await.unwrap();
    assert_eq!(
        storage.keys().await.unwrap(),
        vec!["AGENT:build-01".to_string(), "CLOUD:aws".to_string()]
    );

    storage.remove("CLOUD:aws").await.unwrap();
    storage.remove("CLOUD:never-stored").await.unwrap();
    assert_eq!(storage.keys().await.unwrap(), vec!["AGENT:build-01".to_string()]);
}

#[tokio::test]
async fn test_disambiguators_are_replaced_wholesale() {
    let db = TestDatabase::new().await.unwrap();
    let storage = db.storage();
    assert!(storage.load_disambiguators().await.unwrap().is_empty());

    let mut tokens = HashMap::new();
    tokens.insert("east/aws".to_string(), "a1b2".to_string());
    tokens.insert("west/aws".to_string(), "c3d4".to_string());
    storage.save_disambiguators(&tokens).await.unwrap();
    assert_eq!(storage.load_disambiguators().await.unwrap(), tokens);

    tokens.remove("west/aws");
    storage.save_disambiguators(&tokens).await.unwrap();
    assert_eq!(storage.load_disambiguators().await.unwrap(), tokens);
}

#[tokio::test]
async fn test_store_survives_restart_on_sqlite_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("maintenance.db");
    let path = path.to_string_lossy().to_string();
    let agent = Target::agent(agents::BUILD_1);

    let window_id = {
        let storage = Arc::new(SqliteStorage::new(&path).await.unwrap());
        let store = WindowStore::new(
            storage,
            Arc::new(FakeDirectory::with(&[agent.clone()])),
            Arc::new(FakeClock::new(base_time())),
            RecurrenceSettings::default(),
        );
        let window = MaintenanceWindow::builder(base_time() + minutes(5), base_time() + minutes(65))
            .reason(reasons::KERNEL)
            .build();
        let id = window.id().to_string();
        assert!(store.add_window(&agent, window).await.unwrap());
        id
    };

    let storage = Arc::new(SqliteStorage::new(&path).await.unwrap());
    let store = WindowStore::new(
        storage,
        Arc::new(FakeDirectory::with(&[agent.clone()])),
        Arc::new(FakeClock::new(base_time())),
        RecurrenceSettings::default(),
    );
    let restored = store.window(&agent, &window_id).await.unwrap().unwrap();
    assert_eq!(restored.reason(), reasons::KERNEL);
    assert_eq!(restored.start(), base_time() + minutes(5));
}
