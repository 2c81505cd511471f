//! Tracing-backed run reporter.

use tracing::{error, info};
use uuid::Uuid;

use crate::error::SyncError;
use crate::traits::reporter::RunReporter;
use crate::types::SyncRun;

/// Emits run lifecycle events as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl RunReporter for TracingReporter {
    fn run_started(&self, run_id: Uuid) {
        info!(run_id = %run_id, "Inventory sync started");
    }

    fn nothing_to_do(&self, run_id: Uuid) {
        info!(run_id = %run_id, "No SKUs in commerce store, nothing to sync");
    }

    fn run_failed(&self, run_id: Uuid, error: &SyncError) {
        error!(run_id = %run_id, error = %error, "Inventory sync aborted");
    }

    fn run_completed(&self, run: &SyncRun) {
        info!(
            run_id = %run.run_id,
            started_at = %run.started_at,
            finished_at = %run.finished_at,
            duration_ms = run.duration().num_milliseconds(),
            total = run.total_candidates,
            updated = run.updated_count,
            not_found = run.not_found_count,
            errors = run.error_count,
            "Inventory sync complete"
        );
    }
}
