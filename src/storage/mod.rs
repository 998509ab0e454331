//! Result persistence backends
//!
//! This module provides a trait-based abstraction for appending probe
//! results and querying recent history.
//!
//! ## Design
//!
//! - **Trait-based**: `ResultStore` allows swapping implementations
//! - **Async**: all operations are async for compatibility with Tokio
//! - **Advisory**: probe history is advisory; a failed write is logged and
//!   counted, never retried, and never blocks alerting or metrics
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded database file, WAL journal mode
//! - **PostgreSQL**: shared server, pool sized to the probe concurrency cap

pub mod backend;
pub mod error;
pub mod postgres;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

pub use backend::ResultStore;
pub use error::{StorageError, StorageResult};
pub use schema::ProbeRow;

use crate::config::DatabaseConfig;

/// Open the store selected by the configuration.
///
/// `max_concurrent_checks` bounds how many schedulers can be writing at
/// once and sizes the PostgreSQL pool accordingly.
pub async fn open_store(
    config: &DatabaseConfig,
    max_concurrent_checks: usize,
) -> StorageResult<Arc<dyn ResultStore>> {
    match config {
        DatabaseConfig::Sqlite { path } => {
            let store = sqlite::SqliteStore::new(path).await?;
            Ok(Arc::new(store))
        }
        DatabaseConfig::Postgres { url, readers } => {
            let pool_size = max_concurrent_checks as u32 + readers;
            let store = postgres::PostgresStore::new(url, pool_size).await?;
            Ok(Arc::new(store))
        }
    }
}
