//! Inventory reconciliation between an ERP and a commerce catalog.
//!
//! On a schedule (or on demand) the engine loads the SKUs the commerce
//! catalog already has, reads the matching active materials from the ERP,
//! maps them to product updates and applies them in bounded batches.
//! It never creates products and never deactivates one just because the
//! ERP stopped returning it.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use inventory_sync::{
//!     Config, ErpSourceReader, PostgresCommerceStore, RunCoordinator, TracingReporter,
//! };
//!
//! let config = Config::from_env()?;
//! let source = ErpSourceReader::connect(
//!     &config.erp_database_url,
//!     config.erp_pool_size,
//!     config.branch_id,
//!     config.flag_markers.clone(),
//!     config.sync.query_timeout,
//! )?;
//! let target = PostgresCommerceStore::connect(
//!     &config.commerce_database_url,
//!     config.commerce_pool_size,
//!     config.sync.query_timeout,
//! )?;
//!
//! let coordinator = RunCoordinator::new(
//!     Arc::new(source),
//!     Arc::new(target),
//!     Arc::new(TracingReporter::new()),
//!     config.sync.clone(),
//! )?;
//! let run = coordinator.execute().await?;
//! println!("updated {} of {}", run.updated_count, run.total_candidates);
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod reporter;
pub mod scheduler;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use config::{Config, LogLevel, SyncSettings};
pub use error::{Result, SyncError};
pub use pipeline::{map_to_update, slugify, BatchUpdater, RunCoordinator};
pub use reporter::TracingReporter;
pub use scheduler::{RunGuard, SchedulerState, SyncScheduler, Trigger};
pub use stores::{ErpSourceReader, MemoryCommerceStore, MemorySourceReader, PostgresCommerceStore};
pub use traits::{reporter::RunReporter, source::SourceReader, target::TargetStore};
pub use types::{
    FlagMarkers, InactiveFlag, SourceRecord, SyncRun, TargetRecord, TargetUpdate, UpdateCounts,
};
