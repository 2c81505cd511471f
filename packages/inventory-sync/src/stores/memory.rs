//! In-memory stores for testing and development.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::{source::SourceReader, target::TargetStore};
use crate::types::{SourceRecord, TargetRecord, TargetUpdate};

/// In-memory ERP catalog.
///
/// Applies the same filtering as the SQL reader: key membership, inactive
/// exclusion, and key ordering.
#[derive(Default)]
pub struct MemorySourceReader {
    records: RwLock<Vec<SourceRecord>>,
    fetch_calls: AtomicUsize,
}

impl MemorySourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let reader = Self::new();
        for record in records {
            reader.insert(record);
        }
        reader
    }

    pub fn insert(&self, record: SourceRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.retain(|r| r.key != record.key);
        records.push(record);
    }

    pub fn remove(&self, key: &str) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|r| r.key != key);
    }

    /// Number of fetches that actually reached the catalog.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceReader for MemorySourceReader {
    async fn fetch_active_records_for_keys(
        &self,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<SourceRecord>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let mut matched: Vec<SourceRecord> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| keys.contains(&r.key) && !r.is_marked_inactive())
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(matched)
    }
}

/// In-memory commerce catalog keyed by SKU.
#[derive(Default)]
pub struct MemoryCommerceStore {
    products: RwLock<BTreeMap<String, TargetRecord>>,
}

impl MemoryCommerceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = TargetRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Seed a product, as the storefront admin would.
    pub fn insert(&self, record: TargetRecord) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.sku.clone(), record);
    }

    /// Delete a product, as the storefront admin would.
    pub fn remove(&self, sku: &str) -> Option<TargetRecord> {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(sku)
    }

    pub fn get(&self, sku: &str) -> Option<TargetRecord> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sku)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every product, ordered by SKU.
    pub fn snapshot(&self) -> Vec<TargetRecord> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TargetStore for MemoryCommerceStore {
    async fn load_eligible_keys(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|sku| !sku.trim().is_empty())
            .cloned()
            .collect())
    }

    async fn exists(&self, sku: &str) -> Result<bool> {
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(sku))
    }

    async fn apply_update(&self, sku: &str, update: &TargetUpdate) -> Result<u64> {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        match products.get_mut(sku) {
            Some(record) => {
                record.apply(update);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
