//! PostgreSQL result store
//!
//! Same logical schema as the SQLite backend, for deployments where probe
//! history should live on a shared database server. The connection pool is
//! sized to `max_concurrent_checks` plus a small reader slack so every
//! scheduler can write without queueing behind history queries.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info, instrument};

use super::backend::ResultStore;
use super::error::{StorageError, StorageResult};
use super::schema::ProbeRow;
use crate::ProbeResult;

pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Connect and run migrations. `pool_size` should be
    /// `max_concurrent_checks + reader slack`.
    #[instrument(skip_all)]
    pub async fn new(url: &str, pool_size: u32) -> StorageResult<Self> {
        info!("initializing PostgreSQL store (pool size {pool_size})");

        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations/postgres").run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ResultStore for PostgresStore {
    #[instrument(skip(self, result), fields(endpoint = %result.endpoint_name))]
    async fn record(&self, result: &ProbeResult) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO probe_results (endpoint, ts, success, latency_ms, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&result.endpoint_name)
        .bind(result.timestamp)
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
            WHERE endpoint = $1
            ORDER BY ts DESC
            LIMIT $2
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
                ts: row.get("ts"),
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
        debug!("closing PostgreSQL store");
        self.pool.close().await;
        Ok(())
    }
}
