//! In-memory catalog store.

use std::sync::{PoisonError, RwLock};

use crate::traits::CatalogStore;
use crate::types::CatalogRecord;

/// Insertion-ordered, thread-safe catalog held in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    records: RwLock<Vec<CatalogRecord>>,
}

impl MemoryCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn with_records(records: impl IntoIterator<Item = CatalogRecord>) -> Self {
        let catalog = Self::new();
        for record in records { catalog.upsert(record); }
        catalog
    }

    /// Replace the record with the same id in place, or append it.
    pub fn upsert(&self, record: CatalogRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }
}

impl CatalogStore for MemoryCatalog {
    fn scroll(&self, limit: usize) -> anyhow::Result<Vec<CatalogRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.iter().take(limit).cloned().collect())
    }

    fn count(&self) -> anyhow::Result<usize> {
        Ok(self.records.read().unwrap_or_else(PoisonError::into_inner).len())
    }
}
