//! Typed errors for the sync engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`); the binary and the
//! configuration loader wrap these with `anyhow::Context`.

use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while reconciling the catalog.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The ERP source could not be reached or rejected the query
    #[error("ERP source error: {0}")]
    SourceUnavailable(#[source] BoxError),

    /// The commerce store could not be reached or rejected the statement
    #[error("commerce store error: {0}")]
    TargetUnavailable(#[source] BoxError),

    /// A single statement exceeded the per-query timeout
    #[error("query timed out after {0:?}")]
    QueryTimeout(Duration),

    /// The run exceeded its wall-clock budget before the batch started
    #[error("run exceeded its {budget:?} budget while {phase}")]
    RunTimeout {
        phase: &'static str,
        budget: Duration,
    },

    /// Invalid engine configuration
    #[error("config error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn erp(err: impl Into<BoxError>) -> Self {
        Self::SourceUnavailable(err.into())
    }

    pub fn commerce(err: impl Into<BoxError>) -> Self {
        Self::TargetUnavailable(err.into())
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_failing_side() {
        let err = SyncError::erp("connection refused");
        assert_eq!(err.to_string(), "ERP source error: connection refused");

        let err = SyncError::commerce("relation \"products\" does not exist");
        assert!(err.to_string().starts_with("commerce store error:"));

        let err = SyncError::RunTimeout {
            phase: "loading eligible keys",
            budget: Duration::from_secs(240),
        };
        assert_eq!(
            err.to_string(),
            "run exceeded its 240s budget while loading eligible keys"
        );
    }
}
