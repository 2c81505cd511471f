//! Per-run accounting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outcome tallies produced by the batch updater.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCounts {
    pub updated: usize,
    pub not_found: usize,
    pub errors: usize,
}

impl UpdateCounts {
    pub fn total(&self) -> usize {
        self.updated + self.not_found + self.errors
    }

    pub fn merge(&mut self, other: UpdateCounts) {
        self.updated += other.updated;
        self.not_found += other.not_found;
        self.errors += other.errors;
    }
}

/// Summary of one execution. Created at the start of a run and discarded
/// once logged or returned; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_candidates: usize,
    pub updated_count: usize,
    pub not_found_count: usize,
    pub error_count: usize,
}

impl SyncRun {
    /// A run that found nothing to do.
    pub fn empty(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self::finished(run_id, started_at, UpdateCounts::default())
    }

    /// Close a run from the updater's tallies. `total_candidates` is derived
    /// from the tallies so the three counts always add up.
    pub fn finished(run_id: Uuid, started_at: DateTime<Utc>, counts: UpdateCounts) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total_candidates: counts.total(),
            updated_count: counts.updated,
            not_found_count: counts.not_found,
            error_count: counts.errors,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}
