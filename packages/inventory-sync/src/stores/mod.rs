//! Store implementations for both sides of the sync.
//!
//! Available backends:
//! - `ErpSourceReader` - read-only PostgreSQL reader over the ERP catalog
//! - `PostgresCommerceStore` - PostgreSQL commerce catalog
//! - `MemorySourceReader` / `MemoryCommerceStore` - in-memory, for tests and dry runs

pub mod commerce;
pub mod erp;
pub mod memory;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::error::{Result, SyncError};

pub use commerce::PostgresCommerceStore;
pub use erp::ErpSourceReader;
pub use memory::{MemoryCommerceStore, MemorySourceReader};

/// Connection settings for one side of the sync.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub query_timeout: Duration,
    /// Open every session read-only
    pub read_only: bool,
}

/// Build a pool whose sessions carry a server-side statement timeout.
///
/// Connections are acquired lazily per statement; nothing holds a connection
/// for the length of a run.
pub(crate) fn build_pool(
    database_url: &str,
    settings: &PoolSettings,
    map_err: fn(sqlx::Error) -> SyncError,
) -> Result<PgPool> {
    let timeout_ms = settings.query_timeout.as_millis().to_string();
    let mut session = vec![("statement_timeout", timeout_ms)];
    if settings.read_only {
        session.push(("default_transaction_read_only", "on".to_string()));
    }

    let options = PgConnectOptions::from_str(database_url)
        .map_err(map_err)?
        .options(session);

    Ok(PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.query_timeout)
        .connect_lazy_with(options))
}

/// Run a statement under the per-query timeout.
pub(crate) async fn timed<T, F>(
    limit: Duration,
    fut: F,
    map_err: fn(sqlx::Error) -> SyncError,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(map_err(e)),
        Err(_) => Err(SyncError::QueryTimeout(limit)),
    }
}
