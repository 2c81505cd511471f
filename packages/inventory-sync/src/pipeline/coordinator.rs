//! Run coordinator - one full reconciliation pass.
//!
//! ```text
//! load_eligible_keys() ── empty ──► zero-count run
//!     │
//!     └─► fetch_active_records_for_keys(keys)
//!             └─► map_to_update() per record
//!                     └─► BatchUpdater::apply_updates()
//!                             └─► SyncRun summary
//! ```
//!
//! No state survives between runs. Each run re-derives the eligible keys, so
//! anything that failed last time is simply picked up again.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

use super::mapper::map_to_update;
use super::updater::BatchUpdater;
use crate::config::SyncSettings;
use crate::error::{Result, SyncError};
use crate::traits::{reporter::RunReporter, source::SourceReader, target::TargetStore};
use crate::types::{SyncRun, TargetUpdate};

pub struct RunCoordinator {
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetStore>,
    updater: BatchUpdater,
    reporter: Arc<dyn RunReporter>,
    run_timeout: Duration,
}

impl RunCoordinator {
    pub fn new(
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetStore>,
        reporter: Arc<dyn RunReporter>,
        settings: SyncSettings,
    ) -> Result<Self> {
        let run_timeout = settings.run_timeout;
        let updater = BatchUpdater::new(target.clone(), settings)?;
        Ok(Self {
            source,
            target,
            updater,
            reporter,
            run_timeout,
        })
    }

    /// Execute one run. Errors returned here happened before any per-item
    /// accounting began, so there is no partial summary.
    pub async fn execute(&self) -> Result<SyncRun> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let deadline = Instant::now() + self.run_timeout;

        self.reporter.run_started(run_id);

        let result = self.run_pipeline(run_id, started_at, deadline).await;
        if let Err(e) = &result {
            self.reporter.run_failed(run_id, e);
        }
        result
    }

    /// Manual trigger: runs once and reports success without ever failing or
    /// panicking outward.
    pub async fn run_manual_sync(&self) -> bool {
        match AssertUnwindSafe(self.execute()).catch_unwind().await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                error!(error = %e, "Manual sync failed");
                false
            }
            Err(_) => {
                error!("Manual sync panicked");
                false
            }
        }
    }

    async fn run_pipeline(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        deadline: Instant,
    ) -> Result<SyncRun> {
        let keys = self
            .within(deadline, "loading eligible keys", self.target.load_eligible_keys())
            .await?;

        if keys.is_empty() {
            self.reporter.nothing_to_do(run_id);
            return Ok(SyncRun::empty(run_id, started_at));
        }

        let records = self
            .within(
                deadline,
                "fetching source records",
                self.source.fetch_active_records_for_keys(&keys),
            )
            .await?;

        debug!(
            run_id = %run_id,
            eligible = keys.len(),
            fetched = records.len(),
            "Source records fetched"
        );

        let payloads: Vec<(String, TargetUpdate)> = records
            .iter()
            .map(|record| (record.key.clone(), map_to_update(record)))
            .collect();

        let counts = self.updater.apply_updates(payloads, Some(deadline)).await;

        let run = SyncRun::finished(run_id, started_at, counts);
        self.reporter.run_completed(&run);
        Ok(run)
    }

    async fn within<T, F>(&self, deadline: Instant, phase: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout_at(deadline, fut)
            .await
            .unwrap_or_else(|_| {
                Err(SyncError::RunTimeout {
                    phase,
                    budget: self.run_timeout,
                })
            })
    }
}
