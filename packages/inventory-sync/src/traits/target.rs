//! Read-write access to the commerce store.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::TargetUpdate;

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// All non-empty SKUs currently in the catalog. Empty is a valid answer.
    async fn load_eligible_keys(&self) -> Result<BTreeSet<String>>;

    /// Whether a record with this SKU exists.
    async fn exists(&self, sku: &str) -> Result<bool>;

    /// Rewrite the mapped columns of the record with this SKU and stamp
    /// `updated_at`. Returns the number of rows touched; never inserts.
    async fn apply_update(&self, sku: &str, update: &TargetUpdate) -> Result<u64>;
}
