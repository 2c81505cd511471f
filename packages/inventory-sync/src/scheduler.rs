//! Scheduled inventory sync using tokio-cron-scheduler.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (cron, default every 5 minutes)      Manual trigger
//!     │                                               │
//!     └──────────────► RunGuard::try_acquire() ◄──────┘
//!                          │ Idle → Running
//!                          └─► RunCoordinator::execute()
//!                                  └─► Running → Idle (on return, error or panic)
//! ```
//!
//! A tick that arrives while a run is in progress is skipped; the next tick
//! tries again. Runs never overlap.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::pipeline::RunCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// Single-slot guard shared by every trigger.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Move Idle → Running. Returns `None` if a run is already in progress.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }
}

/// Held for the duration of a run; dropping it moves Running → Idle.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Run the coordinator once if no other run is in progress.
///
/// Returns true only when a run happened and finished without a fatal error.
/// Never fails or panics outward.
pub async fn run_guarded(coordinator: &RunCoordinator, guard: &RunGuard, trigger: Trigger) -> bool {
    let Some(_permit) = guard.try_acquire() else {
        warn!(trigger = %trigger, "Inventory sync already running, skipping");
        return false;
    };

    match AssertUnwindSafe(coordinator.execute()).catch_unwind().await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            error!(trigger = %trigger, error = %e, "Inventory sync failed");
            false
        }
        Err(_) => {
            error!(trigger = %trigger, "Inventory sync panicked");
            false
        }
    }
}

/// Owns the cron scheduler and the run guard.
pub struct SyncScheduler {
    coordinator: Arc<RunCoordinator>,
    guard: RunGuard,
    scheduler: Option<JobScheduler>,
}

impl SyncScheduler {
    pub fn new(coordinator: Arc<RunCoordinator>) -> Self {
        Self {
            coordinator,
            guard: RunGuard::new(),
            scheduler: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.guard.state()
    }

    /// Start the periodic job. `schedule` is a cron expression with a
    /// seconds field, e.g. `0 */5 * * * *`.
    pub async fn start(&mut self, schedule: &str) -> Result<()> {
        let coordinator = self.coordinator.clone();
        let guard = self.guard.clone();
        let sync_job = Job::new_async(schedule, move |_uuid, _lock| {
            let coordinator = coordinator.clone();
            let guard = guard.clone();
            Box::pin(async move {
                run_guarded(&coordinator, &guard, Trigger::Scheduled).await;
            })
        })
        .with_context(|| format!("Invalid sync schedule: {}", schedule))?;

        let scheduler = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        scheduler
            .add(sync_job)
            .await
            .context("Failed to register sync job")?;
        scheduler
            .start()
            .await
            .context("Failed to start job scheduler")?;

        info!(schedule = %schedule, "Inventory sync scheduler started");
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Run once now, outside the schedule. Returns false if a run is already
    /// in progress or the run hit a fatal error.
    pub async fn run_manual_sync(&self) -> bool {
        run_guarded(&self.coordinator, &self.guard, Trigger::Manual).await
    }

    /// Stop the periodic job. A run already in progress finishes on its own.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler
                .shutdown()
                .await
                .context("Failed to shut down job scheduler")?;
            info!("Inventory sync scheduler stopped");
        }
        Ok(())
    }
}
