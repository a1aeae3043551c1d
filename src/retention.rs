//! Bounded dataset history.
//!
//! Ingestion applies the limit atomically through [`DatasetStore::create_retaining`];
//! [`RetentionManager::prune`] trims a store that already holds too many datasets.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::DatasetStore;
use crate::types::DatasetId;

/// Maximum number of dataset summaries a store holds.
pub const RETENTION_LIMIT: usize = 5;

/// Evicts all but the `limit` most recent datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionManager {
    limit: usize,
}

impl Default for RetentionManager {
    fn default() -> Self {
        Self {
            limit: RETENTION_LIMIT,
        }
    }
}

impl RetentionManager {
    /// # Panics
    ///
    /// Panics if `limit == 0`; the most recent ingestion must always survive.
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "retention limit must be > 0");
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Delete every dataset beyond the `limit` most recent. Returns the evicted ids, oldest last.
    ///
    /// Idempotent: a no-op when the store holds `limit` datasets or fewer. A dataset that
    /// disappears while pruning counts as evicted.
    pub fn prune<S: DatasetStore + ?Sized>(&self, store: &S) -> Result<Vec<DatasetId>> {
        if store.count()? <= self.limit {
            return Ok(Vec::new());
        }

        let excess: Vec<DatasetId> = store
            .list_recent(usize::MAX)?
            .into_iter()
            .skip(self.limit)
            .map(|s| s.id)
            .collect();

        for id in &excess {
            match store.delete(*id) {
                Ok(()) => debug!(dataset_id = %id, "dataset evicted"),
                Err(Error::NotFound(_)) => debug!(dataset_id = %id, "dataset already gone"),
                Err(err) => return Err(err),
            }
        }

        if !excess.is_empty() {
            info!(evicted = excess.len(), limit = self.limit, "retention applied");
        }
        Ok(excess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::aggregate;
    use crate::store::MemoryStore;
    use crate::types::{EquipmentRecord, NewDataset};

    fn fill(store: &MemoryStore, n: usize) -> Vec<DatasetId> {
        (0..n)
            .map(|i| {
                let records = vec![EquipmentRecord::new(format!("E{i}"), "Pump", 1.0, 1.0, 1.0)];
                let stats = aggregate(&records).unwrap();
                store
                    .create(NewDataset {
                        filename: format!("{i}.csv"),
                        stats,
                        records,
                    })
                    .unwrap()
                    .id
            })
            .collect()
    }

    #[test]
    fn prune_keeps_the_most_recent() {
        let store = MemoryStore::new();
        let ids = fill(&store, 8);
        let evicted = RetentionManager::default().prune(&store).unwrap();

        assert_eq!(evicted, vec![ids[2], ids[1], ids[0]]);
        assert_eq!(store.count().unwrap(), 5);
        let kept: Vec<DatasetId> = store.list_recent(10).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(kept, vec![ids[7], ids[6], ids[5], ids[4], ids[3]]);
    }

    #[test]
    fn prune_is_idempotent() {
        let store = MemoryStore::new();
        fill(&store, 6);
        let manager = RetentionManager::default();
        assert_eq!(manager.prune(&store).unwrap().len(), 1);
        assert!(manager.prune(&store).unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 5);
    }

    #[test]
    fn prune_below_limit_is_noop() {
        let store = MemoryStore::new();
        fill(&store, 3);
        assert!(RetentionManager::new(5).prune(&store).unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    #[should_panic(expected = "retention limit must be > 0")]
    fn zero_limit_panics() {
        let _ = RetentionManager::new(0);
    }
}
