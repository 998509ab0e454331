//! SQLite result store
//!
//! Stores probe history in a local database file.
//!
//! ## Configuration
//!
//! - **WAL mode** with `synchronous = NORMAL`: readers do not block the
//!   writer, and an abrupt shutdown loses at most the last checkpoint
//! - **Two pooled connections**: one effective writer plus a reader for
//!   history queries
//! - **Migrations**: schema is versioned with sqlx and applied on open

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use super::backend::ResultStore;
use super::error::{StorageError, StorageResult};
use super::schema::ProbeRow;
use crate::ProbeResult;

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (and create if missing) the database file and run migrations.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        // One effective writer plus a reader for history queries
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;

        Ok(Self { pool })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    #[instrument(skip(self, result), fields(endpoint = %result.endpoint_name))]
    async fn record(&self, result: &ProbeResult) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO probe_results (endpoint, ts, success, latency_ms, detail)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.endpoint_name)
        .bind(Self::timestamp_to_millis(&result.timestamp))
        .bind(result.success)
        .bind(result.latency_ms())
        .bind(&result.detail)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, endpoint: &str, limit: usize) -> StorageResult<Vec<ProbeRow>> {
        let rows = sqlx::query(
            r#"
            SELECT endpoint, ts, success, latency_ms, detail
            FROM probe_results
            WHERE endpoint = ?
            ORDER BY ts DESC
            LIMIT ?
            "#,
        )
        .bind(endpoint)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProbeRow {
                endpoint: row.get("endpoint"),
                ts: Self::millis_to_timestamp(row.get("ts")),
                success: row.get("success"),
                latency_ms: row.get("latency_ms"),
                detail: row.get("detail"),
            })
            .collect())
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
