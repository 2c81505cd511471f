//! Testing utilities including failure-injecting doubles.
//!
//! These wrap the in-memory stores so pipeline behavior can be exercised
//! without a database: per-SKU failures, panics, latency, gated fetches and
//! a reporter that records what it was told.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::stores::{MemoryCommerceStore, MemorySourceReader};
use crate::traits::{reporter::RunReporter, source::SourceReader, target::TargetStore};
use crate::types::{SyncRun, TargetUpdate};

/// A plausible update payload for `sku`.
pub fn sample_update(sku: &str) -> TargetUpdate {
    TargetUpdate {
        name: format!("Product {}", sku),
        slug: format!("product-{}", sku.to_lowercase()),
        description: format!("Product {}", sku),
        price: Decimal::from(10),
        discount_price: None,
        stock: 5,
        active: true,
    }
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Always,
    Times(usize),
    Panic,
}

/// Commerce store wrapper that injects faults into `apply_update`.
pub struct FlakyTargetStore {
    inner: Arc<MemoryCommerceStore>,
    faults: Mutex<HashMap<String, Fault>>,
    attempts: Mutex<HashMap<String, usize>>,
    vanishing: Mutex<HashSet<String>>,
    fail_key_load: AtomicBool,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FlakyTargetStore {
    pub fn new(inner: Arc<MemoryCommerceStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            vanishing: Mutex::new(HashSet::new()),
            fail_key_load: AtomicBool::new(false),
            latency: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every update of `sku` fails.
    pub fn fail_always(self, sku: impl Into<String>) -> Self {
        self.set_fault(sku.into(), Fault::Always);
        self
    }

    /// The first `times` updates of `sku` fail, later ones succeed.
    pub fn fail_times(self, sku: impl Into<String>, times: usize) -> Self {
        self.set_fault(sku.into(), Fault::Times(times));
        self
    }

    /// Updating `sku` panics.
    pub fn panic_on(self, sku: impl Into<String>) -> Self {
        self.set_fault(sku.into(), Fault::Panic);
        self
    }

    /// `sku` is deleted right after its existence check succeeds, as if
    /// another writer removed it before the update.
    pub fn vanish_after_check(self, sku: impl Into<String>) -> Self {
        self.vanishing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sku.into());
        self
    }

    /// Loading eligible keys fails as if the store were unreachable.
    pub fn failing_key_load(self) -> Self {
        self.fail_key_load.store(true, Ordering::SeqCst);
        self
    }

    /// Every store call sleeps this long.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// How many times `apply_update` was called for `sku`.
    pub fn update_attempts(&self, sku: &str) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sku)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of concurrent store calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn set_fault(&self, sku: String, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sku, fault);
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_fault(&self, sku: &str) -> Result<()> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
            let count = attempts.entry(sku.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sku)
            .copied();

        match fault {
            Some(Fault::Always) => Err(SyncError::commerce(format!("injected failure for {}", sku))),
            Some(Fault::Times(n)) if attempt <= n => Err(SyncError::commerce(format!(
                "injected failure {} of {} for {}",
                attempt, n, sku
            ))),
            Some(Fault::Panic) => panic!("injected panic for {}", sku),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TargetStore for FlakyTargetStore {
    async fn load_eligible_keys(&self) -> Result<BTreeSet<String>> {
        if self.fail_key_load.load(Ordering::SeqCst) {
            return Err(SyncError::commerce("connection refused"));
        }
        self.inner.load_eligible_keys().await
    }

    async fn exists(&self, sku: &str) -> Result<bool> {
        self.enter().await;
        let result = self.inner.exists(sku).await;
        let vanishes = self
            .vanishing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(sku);
        if vanishes {
            self.inner.remove(sku);
        }
        self.leave();
        result
    }

    async fn apply_update(&self, sku: &str, update: &TargetUpdate) -> Result<u64> {
        self.enter().await;
        let result = match self.check_fault(sku) {
            Ok(()) => self.inner.apply_update(sku, update).await,
            Err(e) => Err(e),
        };
        self.leave();
        result
    }
}

/// Source reader that always fails, as if the ERP were unreachable.
#[derive(Default)]
pub struct FailingSourceReader {
    calls: AtomicUsize,
}

impl FailingSourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceReader for FailingSourceReader {
    async fn fetch_active_records_for_keys(
        &self,
        _keys: &BTreeSet<String>,
    ) -> Result<Vec<crate::types::SourceRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SyncError::erp("ERP connection reset"))
    }
}

/// Source reader that blocks every fetch until released, for holding a run
/// open while another trigger arrives.
pub struct GatedSourceReader {
    inner: Arc<MemorySourceReader>,
    gate: Notify,
    entered: AtomicUsize,
}

impl GatedSourceReader {
    pub fn new(inner: Arc<MemorySourceReader>) -> Self {
        Self {
            inner,
            gate: Notify::new(),
            entered: AtomicUsize::new(0),
        }
    }

    /// Number of fetches currently or previously waiting at the gate.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Let one waiting (or the next) fetch through.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl SourceReader for GatedSourceReader {
    async fn fetch_active_records_for_keys(
        &self,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<crate::types::SourceRecord>> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.inner.fetch_active_records_for_keys(keys).await
    }
}

/// Lifecycle events captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedEvent {
    Started(Uuid),
    NothingToDo(Uuid),
    Failed { run_id: Uuid, error: String },
    Completed(SyncRun),
}

/// Reporter that records events instead of logging them.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportedEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn completed_runs(&self) -> Vec<SyncRun> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportedEvent::Completed(run) => Some(run),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportedEvent::Failed { error, .. } => Some(error),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl RunReporter for RecordingReporter {
    fn run_started(&self, run_id: Uuid) {
        self.push(ReportedEvent::Started(run_id));
    }

    fn nothing_to_do(&self, run_id: Uuid) {
        self.push(ReportedEvent::NothingToDo(run_id));
    }

    fn run_failed(&self, run_id: Uuid, error: &SyncError) {
        self.push(ReportedEvent::Failed {
            run_id,
            error: error.to_string(),
        });
    }

    fn run_completed(&self, run: &SyncRun) {
        self.push(ReportedEvent::Completed(run.clone()));
    }
}
