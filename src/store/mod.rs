//! Durable keyed collection of dataset summaries and their records.
//!
//! [`DatasetStore`] is the contract the rest of the crate relies on:
//!
//! - [`DatasetStore::create`] persists a summary and all of its records as one atomic unit. On
//!   failure the store is left exactly as before, and no reader ever sees a partial record set.
//! - [`DatasetStore::create_retaining`] does the same and evicts everything beyond the `limit` most
//!   recent summaries in that same unit, so no reader ever sees more than `limit` summaries or an
//!   evicted summary that is still listed.
//! - [`DatasetStore::delete`] removes a summary and cascades to its records.
//! - Recency order is `uploaded_at` descending, ties broken by id descending. The store assigns
//!   `uploaded_at` and never assigns one earlier than an existing summary's.
//!
//! Implementations: [`SqliteStore`] (durable) and [`MemoryStore`] (process-local).

mod memory;
mod migrations;
mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{NotFound, Result, StorageError};
use crate::types::{DatasetId, DatasetSummary, EquipmentRecord, NewDataset};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage contract for datasets.
pub trait DatasetStore: Send + Sync {
    /// Atomically persist a summary and its records; assigns id and `uploaded_at`.
    fn create(&self, dataset: NewDataset) -> Result<DatasetSummary>;

    /// Atomically persist a dataset and evict every summary beyond the `limit` most recent.
    ///
    /// Returns the new summary and the evicted ids, most recent first. The new dataset is always
    /// retained, even when `limit` is 0. Nothing changes if any step fails.
    fn create_retaining(
        &self,
        dataset: NewDataset,
        limit: usize,
    ) -> Result<(DatasetSummary, Vec<DatasetId>)>;

    /// Point lookup; [`NotFound::Dataset`] if absent.
    fn get(&self, id: DatasetId) -> Result<DatasetSummary>;

    /// The dataset's records sorted by name (ties keep ingestion order).
    fn get_records(&self, id: DatasetId) -> Result<Vec<EquipmentRecord>>;

    /// Up to `n` summaries, most recent first.
    fn list_recent(&self, n: usize) -> Result<Vec<DatasetSummary>>;

    /// Remove a summary and all of its records.
    fn delete(&self, id: DatasetId) -> Result<()>;

    /// Number of stored summaries.
    fn count(&self) -> Result<usize>;

    /// The most recent summary; [`NotFound::NoDatasets`] when the store is empty.
    fn latest(&self) -> Result<DatasetSummary> {
        self.list_recent(1)?
            .into_iter()
            .next()
            .ok_or_else(|| NotFound::NoDatasets.into())
    }
}

impl<S: DatasetStore + ?Sized> DatasetStore for Arc<S> {
    fn create(&self, dataset: NewDataset) -> Result<DatasetSummary> {
        (**self).create(dataset)
    }

    fn create_retaining(
        &self,
        dataset: NewDataset,
        limit: usize,
    ) -> Result<(DatasetSummary, Vec<DatasetId>)> {
        (**self).create_retaining(dataset, limit)
    }

    fn get(&self, id: DatasetId) -> Result<DatasetSummary> {
        (**self).get(id)
    }

    fn get_records(&self, id: DatasetId) -> Result<Vec<EquipmentRecord>> {
        (**self).get_records(id)
    }

    fn list_recent(&self, n: usize) -> Result<Vec<DatasetSummary>> {
        (**self).list_recent(n)
    }

    fn delete(&self, id: DatasetId) -> Result<()> {
        (**self).delete(id)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }

    fn latest(&self) -> Result<DatasetSummary> {
        (**self).latest()
    }
}

/// Reject a dataset whose counts disagree with its records before anything is written.
fn check_consistency(dataset: &NewDataset) -> Result<()> {
    let n = dataset.records.len() as u64;
    if dataset.stats.total_count != n {
        return Err(StorageError::Inconsistent(format!(
            "total_count {} does not match {} records",
            dataset.stats.total_count, n
        ))
        .into());
    }
    let distributed: u64 = dataset.stats.type_distribution.values().sum();
    if distributed != n {
        return Err(StorageError::Inconsistent(format!(
            "type distribution sums to {distributed}, expected {n}"
        ))
        .into());
    }
    Ok(())
}

/// Creation timestamp for a new summary: now (microsecond precision), but never before `latest`.
fn next_uploaded_at(latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match latest {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

/// Recency order: `uploaded_at` descending, then id descending.
fn by_recency(a: &DatasetSummary, b: &DatasetSummary) -> std::cmp::Ordering {
    b.uploaded_at
        .cmp(&a.uploaded_at)
        .then_with(|| b.id.cmp(&a.id))
}
