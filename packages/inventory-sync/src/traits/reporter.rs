//! Run lifecycle reporting.

use uuid::Uuid;

use crate::error::SyncError;
use crate::types::SyncRun;

/// Receives run lifecycle events. Passed into the coordinator explicitly so
/// tests can observe runs without a global subscriber.
pub trait RunReporter: Send + Sync {
    fn run_started(&self, run_id: Uuid);

    /// The catalog had no SKUs, so the run ended without further I/O.
    fn nothing_to_do(&self, run_id: Uuid);

    /// A fatal error ended the run before per-item accounting began.
    fn run_failed(&self, run_id: Uuid, error: &SyncError);

    fn run_completed(&self, run: &SyncRun);
}
