use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{NotFound, Result};
use crate::types::{DatasetId, DatasetSummary, EquipmentRecord, NewDataset, sort_by_name};

use super::{DatasetStore, by_recency, check_consistency, next_uploaded_at};

struct Entry {
    summary: DatasetSummary,
    /// Kept name-sorted.
    records: Vec<EquipmentRecord>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    entries: BTreeMap<DatasetId, Entry>,
}

/// Process-local [`DatasetStore`].
///
/// A dataset is fully built before it is published under the write lock, so readers see either
/// the whole dataset or nothing.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Inner {
    fn insert(&mut self, dataset: NewDataset) -> DatasetSummary {
        let latest = self.entries.values().map(|e| e.summary.uploaded_at).max();
        let id = DatasetId(self.last_id + 1);

        let (summary, mut records) = dataset.into_summary(id, next_uploaded_at(latest));
        sort_by_name(&mut records);

        self.last_id = id.0;
        self.entries.insert(
            id,
            Entry {
                summary: summary.clone(),
                records,
            },
        );
        summary
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("MemoryStore")
            .field("datasets", &inner.entries.len())
            .field("last_id", &inner.last_id)
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DatasetStore for MemoryStore {
    fn create(&self, dataset: NewDataset) -> Result<DatasetSummary> {
        check_consistency(&dataset)?;
        Ok(self.write().insert(dataset))
    }

    fn create_retaining(
        &self,
        dataset: NewDataset,
        limit: usize,
    ) -> Result<(DatasetSummary, Vec<DatasetId>)> {
        check_consistency(&dataset)?;

        let mut inner = self.write();
        let summary = inner.insert(dataset);
        let mut recent: Vec<&DatasetSummary> =
            inner.entries.values().map(|e| &e.summary).collect();
        recent.sort_by(|a, b| by_recency(a, b));
        let evicted: Vec<DatasetId> = recent.iter().skip(limit.max(1)).map(|s| s.id).collect();
        for id in &evicted {
            inner.entries.remove(id);
        }
        Ok((summary, evicted))
    }

    fn get(&self, id: DatasetId) -> Result<DatasetSummary> {
        self.read()
            .entries
            .get(&id)
            .map(|e| e.summary.clone())
            .ok_or_else(|| NotFound::Dataset(id).into())
    }

    fn get_records(&self, id: DatasetId) -> Result<Vec<EquipmentRecord>> {
        self.read()
            .entries
            .get(&id)
            .map(|e| e.records.clone())
            .ok_or_else(|| NotFound::Dataset(id).into())
    }

    fn list_recent(&self, n: usize) -> Result<Vec<DatasetSummary>> {
        let mut all: Vec<DatasetSummary> = self
            .read()
            .entries
            .values()
            .map(|e| e.summary.clone())
            .collect();
        all.sort_by(by_recency);
        all.truncate(n);
        Ok(all)
    }

    fn delete(&self, id: DatasetId) -> Result<()> {
        self.write()
            .entries
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| NotFound::Dataset(id).into())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read().entries.len())
    }
}
