use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;

use crate::error::SyncError;
use crate::types::FlagMarkers;

/// Connections the commerce pool keeps free for the key-set load and other
/// consumers while a batch is running.
const POOL_HEADROOM: u32 = 2;

/// Log verbosity accepted by `SYNC_LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Default filter directive for the subscriber when `RUST_LOG` is unset.
    pub fn filter_directive(&self) -> String {
        format!("{},inventory_sync={},sqlx=warn", self.as_str(), self.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(anyhow!(
                "Invalid log level: {} (expected error|warn|info|debug)",
                other
            )),
        }
    }
}

/// Engine tuning shared by the updater and coordinator.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Payloads per chunk handed to the updater
    pub batch_size: usize,
    /// Concurrent per-item updates within a chunk
    pub max_concurrency: usize,
    /// Extra attempts per item before it counts as an error
    pub max_retries: u32,
    /// Base delay between attempts, doubled on each retry
    pub retry_delay: Duration,
    /// Wall-clock budget for one run
    pub run_timeout: Duration,
    /// Budget for a single statement, including pool acquisition
    pub query_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrency: 8,
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            run_timeout: Duration::from_secs(240),
            query_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Cap concurrency below the commerce pool size, leaving headroom.
    pub fn bounded_by_pool(mut self, pool_size: u32) -> Self {
        let ceiling = pool_size.saturating_sub(POOL_HEADROOM).max(1) as usize;
        self.max_concurrency = self.max_concurrency.min(ceiling);
        self
    }

    pub fn validate(&self) -> std::result::Result<(), SyncError> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch size must be at least 1".into()));
        }
        if self.max_concurrency == 0 {
            return Err(SyncError::Config("concurrency must be at least 1".into()));
        }
        if self.run_timeout.is_zero() || self.query_timeout.is_zero() {
            return Err(SyncError::Config("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub erp_database_url: String,
    pub commerce_database_url: String,
    pub erp_pool_size: u32,
    pub commerce_pool_size: u32,
    /// Cron expression with a seconds field
    pub schedule: String,
    pub log_level: LogLevel,
    /// Branch whose stock and prices are read
    pub branch_id: i64,
    pub flag_markers: FlagMarkers,
    /// `SYNC_MAX_CONCURRENCY` as given, before the pool clamp
    pub requested_concurrency: usize,
    pub sync: SyncSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let commerce_pool_size = parse_or(&lookup, "COMMERCE_POOL_SIZE", 10u32)?;

        let defaults = SyncSettings::default();
        let requested_concurrency =
            parse_or(&lookup, "SYNC_MAX_CONCURRENCY", defaults.max_concurrency)?;
        let sync = SyncSettings {
            batch_size: parse_or(&lookup, "SYNC_BATCH_SIZE", defaults.batch_size)?,
            max_concurrency: requested_concurrency,
            max_retries: parse_or(&lookup, "SYNC_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_millis(parse_or(&lookup, "SYNC_RETRY_DELAY_MS", 500u64)?),
            run_timeout: Duration::from_secs(parse_or(&lookup, "SYNC_RUN_TIMEOUT_SECS", 240u64)?),
            query_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SYNC_QUERY_TIMEOUT_SECS",
                30u64,
            )?),
        }
        .bounded_by_pool(commerce_pool_size);
        sync.validate().context("Invalid sync settings")?;

        let default_markers = FlagMarkers::default();

        Ok(Self {
            erp_database_url: lookup("ERP_DATABASE_URL").context("ERP_DATABASE_URL must be set")?,
            commerce_database_url: lookup("COMMERCE_DATABASE_URL")
                .context("COMMERCE_DATABASE_URL must be set")?,
            erp_pool_size: parse_or(&lookup, "ERP_POOL_SIZE", 4u32)?,
            commerce_pool_size,
            schedule: lookup("SYNC_SCHEDULE").unwrap_or_else(|| "0 */5 * * * *".to_string()),
            log_level: parse_or(&lookup, "SYNC_LOG_LEVEL", LogLevel::Info)?,
            branch_id: parse_or(&lookup, "ERP_BRANCH_ID", 1i64)?,
            flag_markers: FlagMarkers {
                active: lookup("ERP_ACTIVE_MARKER").unwrap_or(default_markers.active),
                inactive: lookup("ERP_INACTIVE_MARKER").unwrap_or(default_markers.inactive),
            },
            requested_concurrency,
            sync,
        })
    }

    pub fn concurrency_was_clamped(&self) -> bool {
        self.sync.max_concurrency < self.requested_concurrency
    }

    /// Log the effective settings. Call once the subscriber is installed.
    pub fn log_startup(&self) {
        if self.concurrency_was_clamped() {
            tracing::warn!(
                requested = self.requested_concurrency,
                ceiling = self.sync.max_concurrency,
                pool_size = self.commerce_pool_size,
                "Clamping update concurrency below the commerce pool size"
            );
        }
        tracing::info!(
            schedule = %self.schedule,
            branch_id = self.branch_id,
            batch_size = self.sync.batch_size,
            concurrency = self.sync.max_concurrency,
            max_retries = self.sync.max_retries,
            run_timeout_secs = self.sync.run_timeout.as_secs(),
            "Configuration loaded"
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
