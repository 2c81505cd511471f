//! Batch updater - applies mapped payloads to the commerce store.
//!
//! ```text
//! payloads ──► chunks(batch_size)
//!                 └─► per item (≤ max_concurrency in flight)
//!                       ├─► exists(sku)?   no ─► not_found
//!                       └─► apply_update   err ─► retry with backoff ─► error
//! ```
//!
//! With a run deadline, an item is not started, retried or left running
//! past it; any of those counts the item as an error.
//!
//! Every item is isolated: an error or panic in one item is counted and
//! logged, and the batch carries on.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::SyncSettings;
use crate::error::Result;
use crate::traits::target::TargetStore;
use crate::types::{TargetUpdate, UpdateCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Updated,
    NotFound,
    Failed,
}

enum Applied {
    Updated,
    Missing,
}

pub struct BatchUpdater {
    store: Arc<dyn TargetStore>,
    settings: SyncSettings,
    permits: Arc<Semaphore>,
}

impl BatchUpdater {
    pub fn new(store: Arc<dyn TargetStore>, settings: SyncSettings) -> Result<Self> {
        settings.validate()?;
        let permits = Arc::new(Semaphore::new(settings.max_concurrency));
        Ok(Self {
            store,
            settings,
            permits,
        })
    }

    /// Apply every payload and return the tallies. Never fails: per-item
    /// problems are counted as errors.
    ///
    /// Items not started before `deadline` are skipped and counted as errors,
    /// so `counts.total()` always equals `payloads.len()`.
    pub async fn apply_updates(
        &self,
        payloads: Vec<(String, TargetUpdate)>,
        deadline: Option<Instant>,
    ) -> UpdateCounts {
        let mut counts = UpdateCounts::default();
        let chunk_count = payloads.len().div_ceil(self.settings.batch_size);

        for (index, chunk) in payloads.chunks(self.settings.batch_size).enumerate() {
            debug!(
                chunk = index + 1,
                chunks = chunk_count,
                size = chunk.len(),
                "Applying update chunk"
            );

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|(sku, update)| self.run_isolated(sku, update, deadline)),
            )
            .await;

            let chunk_counts = tally(&outcomes);
            info!(
                chunk = index + 1,
                updated = chunk_counts.updated,
                not_found = chunk_counts.not_found,
                errors = chunk_counts.errors,
                "Update chunk complete"
            );
            counts.merge(chunk_counts);
        }

        counts
    }

    async fn run_isolated(
        &self,
        sku: &str,
        update: &TargetUpdate,
        deadline: Option<Instant>,
    ) -> ItemOutcome {
        let Ok(_permit) = self.permits.acquire().await else {
            error!(sku = %sku, "Update pool closed");
            return ItemOutcome::Failed;
        };

        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(sku = %sku, "Run deadline reached, skipping update");
            return ItemOutcome::Failed;
        }

        match AssertUnwindSafe(self.process_item(sku, update, deadline))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(sku = %sku, "Update panicked");
                ItemOutcome::Failed
            }
        }
    }

    /// Attempts never outlive `deadline`, and a retry whose backoff would end
    /// past it is not started.
    async fn process_item(
        &self,
        sku: &str,
        update: &TargetUpdate,
        deadline: Option<Instant>,
    ) -> ItemOutcome {
        let mut attempt: u32 = 0;
        loop {
            let result = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, self.try_apply(sku, update)).await {
                        Ok(result) => result,
                        Err(_) => {
                            error!(
                                sku = %sku,
                                attempts = attempt + 1,
                                "Run deadline reached during update"
                            );
                            return ItemOutcome::Failed;
                        }
                    }
                }
                None => self.try_apply(sku, update).await,
            };

            match result {
                Ok(Applied::Updated) => {
                    debug!(sku = %sku, "Product updated");
                    return ItemOutcome::Updated;
                }
                Ok(Applied::Missing) => {
                    warn!(sku = %sku, "Product not found in commerce store, skipping");
                    return ItemOutcome::NotFound;
                }
                Err(e) if attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = self
                        .settings
                        .retry_delay
                        .saturating_mul(2u32.saturating_pow(attempt - 1));
                    let out_of_time = deadline.is_some_and(|d| {
                        Instant::now().checked_add(delay).map_or(true, |end| end >= d)
                    });
                    if out_of_time {
                        error!(
                            sku = %sku,
                            error = %e,
                            attempts = attempt,
                            "Update failed, no time left in run to retry"
                        );
                        return ItemOutcome::Failed;
                    }
                    warn!(
                        sku = %sku,
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Update failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        sku = %sku,
                        error = %e,
                        attempts = attempt + 1,
                        "Update failed"
                    );
                    return ItemOutcome::Failed;
                }
            }
        }
    }

    /// Existence check followed by the update, one SKU at a time.
    async fn try_apply(&self, sku: &str, update: &TargetUpdate) -> Result<Applied> {
        if !self.store.exists(sku).await? {
            return Ok(Applied::Missing);
        }

        // The row can disappear between the check and the update.
        match self.store.apply_update(sku, update).await? {
            0 => Ok(Applied::Missing),
            _ => Ok(Applied::Updated),
        }
    }
}

fn tally(outcomes: &[ItemOutcome]) -> UpdateCounts {
    let mut counts = UpdateCounts::default();
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Updated => counts.updated += 1,
            ItemOutcome::NotFound => counts.not_found += 1,
            ItemOutcome::Failed => counts.errors += 1,
        }
    }
    counts
}
