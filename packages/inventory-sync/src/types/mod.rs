//! Data types shared across the pipeline.

pub mod run;
pub mod source;
pub mod target;

pub use run::{SyncRun, UpdateCounts};
pub use source::{FlagMarkers, InactiveFlag, SourceRecord};
pub use target::{TargetRecord, TargetUpdate};
