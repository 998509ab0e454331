//! Result store trait definition

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::ProbeRow;
use crate::ProbeResult;

/// Trait for probe result persistence backends
///
/// All backends (SQLite, PostgreSQL) implement this trait. It is
/// deliberately small: an append operation and a bounded history query.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync`; one store instance is shared by
/// every endpoint scheduler.
///
/// ## Failure policy
///
/// `record` errors are surfaced to the caller, but callers treat history
/// as advisory: the scheduler logs the error, bumps a counter and moves
/// on. Backends must not retry internally.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Append one probe result.
    ///
    /// Each call is transactional on its own: a crash between calls loses
    /// at most results that were never acknowledged.
    async fn record(&self, result: &ProbeResult) -> StorageResult<()>;

    /// The most recent `limit` rows for an endpoint, newest first.
    async fn recent(&self, endpoint: &str, limit: usize) -> StorageResult<Vec<ProbeRow>>;

    /// Lightweight connectivity check.
    async fn health_check(&self) -> StorageResult<()>;

    /// Close the backend, releasing connections.
    async fn close(&self) -> StorageResult<()>;
}
