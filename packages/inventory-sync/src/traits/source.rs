//! Read-only access to the ERP.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SourceRecord;

/// Reader over the ERP catalog. Implementations must not write to the source.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Fetch the records whose key is in `keys`, excluding rows the ERP marks
    /// inactive. Rows come back ordered by key ascending.
    ///
    /// An empty `keys` set returns an empty list without touching the source.
    async fn fetch_active_records_for_keys(
        &self,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<SourceRecord>>;
}
