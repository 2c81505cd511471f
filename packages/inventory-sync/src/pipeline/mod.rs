//! Sync pipeline: mapping, batched updates and run coordination.

pub mod coordinator;
pub mod mapper;
pub mod updater;

pub use coordinator::RunCoordinator;
pub use mapper::{map_to_update, slugify};
pub use updater::BatchUpdater;
