//! Result store round-trips through the SQLite backend

use std::time::Duration;

use server_monitor::ProbeResult;
use server_monitor::config::DatabaseConfig;
use server_monitor::storage::{self, ProbeRow};

#[tokio::test]
async fn round_trip_preserves_all_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = storage::open_store(
        &DatabaseConfig::Sqlite {
            path: dir.path().join("results.db"),
        },
        4,
    )
    .await
    .unwrap();

    let result = ProbeResult::up("api", Duration::from_millis(37), "200");
    store.record(&result).await.unwrap();

    let rows = store.recent("api", 1).await.unwrap();
    assert_eq!(rows.len(), 1);

    // The persisted row equals the result at millisecond precision
    let mut expected = ProbeRow::from_result(&result);
    expected.ts =
        chrono::DateTime::from_timestamp_millis(result.timestamp.timestamp_millis()).unwrap();
    assert_eq!(rows[0], expected);

    store.close().await.unwrap();
}

#[tokio::test]
async fn database_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.db");

    {
        let store = storage::open_store(&DatabaseConfig::Sqlite { path: path.clone() }, 4)
            .await
            .unwrap();
        store
            .record(&ProbeResult::down("api", None, "timeout"))
            .await
            .unwrap();
        store.close().await.unwrap();
    }

    let store = storage::open_store(&DatabaseConfig::Sqlite { path }, 4)
        .await
        .unwrap();
    let rows = store.recent("api", 10).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert!(!rows[0].success);
    assert_eq!(rows[0].detail, "timeout");

    store.close().await.unwrap();
}

#[tokio::test]
async fn health_check_succeeds_on_open_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = storage::open_store(
        &DatabaseConfig::Sqlite {
            path: dir.path().join("results.db"),
        },
        4,
    )
    .await
    .unwrap();

    store.health_check().await.unwrap();
    store.close().await.unwrap();
}
