//! The query and ingestion surface consumed by transport layers.
//!
//! [`AnalyticsService`] wires validation, parsing, aggregation, storage and retention together:
//!
//! ```text
//! payload -> schema check -> row parse -> aggregate -> store.create_retaining
//! ```
//!
//! "Insert, recount, evict" is one atomic store operation
//! ([`DatasetStore::create_retaining`]), so the retention bound holds for every reader at every
//! moment, even while several ingestions race.
//!
//! ```
//! use equipment_analytics::service::AnalyticsService;
//! use equipment_analytics::store::MemoryStore;
//!
//! # fn main() -> Result<(), equipment_analytics::Error> {
//! let service = AnalyticsService::new(MemoryStore::new());
//! let body = b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP1,Pump,5,50,200\nP2,Valve,1,10,20\n";
//! let dataset = service.ingest("plant.csv", body)?;
//! assert_eq!(dataset.summary.total_count, 2);
//! assert_eq!(service.summary(None)?.avg_flowrate, 3.0);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, info_span};

use crate::error::{Error, Result};
use crate::ingestion::{
    IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats, declared_filename,
    parse_payload,
};
use crate::processing::{Comparison, aggregate, compare, compare_against};
use crate::report::{Report, build_report};
use crate::retention::RetentionManager;
use crate::store::DatasetStore;
use crate::types::{Dataset, DatasetId, DatasetSummary, EquipmentRecord, NewDataset, sort_by_name};

/// Options controlling [`AnalyticsService`] behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ServiceOptions {
    /// Eviction policy applied as part of every successful ingestion.
    pub retention: RetentionManager,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for ServiceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceOptions")
            .field("retention", &self.retention)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            retention: RetentionManager::default(),
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Ingestion pipeline and read queries over a [`DatasetStore`].
pub struct AnalyticsService<S> {
    store: S,
    options: ServiceOptions,
}

impl<S: fmt::Debug> fmt::Debug for AnalyticsService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsService")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish()
    }
}

impl<S: DatasetStore> AnalyticsService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, ServiceOptions::default())
    }

    pub fn with_options(store: S, options: ServiceOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate, parse, aggregate and persist an uploaded payload, evicting beyond the retention
    /// limit in the same atomic step.
    ///
    /// Nothing is persisted unless every row parses, and a storage failure leaves the store
    /// exactly as it was.
    pub fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<Dataset> {
        let ctx = IngestionContext {
            filename: filename.to_owned(),
            bytes: bytes.len(),
        };
        let _span = info_span!("ingest", filename = %filename, bytes = bytes.len()).entered();

        let result = self.ingest_inner(filename, bytes);
        self.observe(&ctx, &result);
        result.map(|(dataset, _)| dataset)
    }

    /// Read a file and [`ingest`](Self::ingest) it under its file name.
    pub fn ingest_path(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let filename = declared_filename(path)?;
        match std::fs::read(path) {
            Ok(bytes) => self.ingest(&filename, &bytes),
            Err(err) => {
                let result = Err(Error::Io(err));
                self.observe(&IngestionContext { filename, bytes: 0 }, &result);
                result.map(|(dataset, _)| dataset)
            }
        }
    }

    fn ingest_inner(&self, filename: &str, bytes: &[u8]) -> Result<(Dataset, Vec<DatasetId>)> {
        let records = parse_payload(filename, bytes)?;
        let stats = aggregate(&records)?;

        let mut sorted = records.clone();
        sort_by_name(&mut sorted);
        let new = NewDataset {
            filename: filename.to_owned(),
            stats,
            records,
        };

        let (summary, evicted) = self
            .store
            .create_retaining(new, self.options.retention.limit())?;
        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                limit = self.options.retention.limit(),
                "retention applied"
            );
        }

        Ok((
            Dataset {
                summary,
                records: sorted,
            },
            evicted,
        ))
    }

    fn observe(&self, ctx: &IngestionContext, result: &Result<(Dataset, Vec<DatasetId>)>) {
        let Some(obs) = self.options.observer.as_ref() else {
            return;
        };
        match result {
            Ok((dataset, evicted)) => obs.on_success(
                ctx,
                &IngestionStats {
                    dataset_id: dataset.summary.id,
                    rows: dataset.records.len(),
                    evicted: evicted.clone(),
                },
            ),
            Err(e) => {
                let sev = IngestionSeverity::for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= self.options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }

    /// Evict everything beyond the retention limit, e.g. after opening a store written with a
    /// larger limit. Returns the evicted ids, most recent first.
    pub fn enforce_retention(&self) -> Result<Vec<DatasetId>> {
        self.options.retention.prune(&self.store)
    }

    /// Summary of `id`, or of the latest dataset when `id` is `None`.
    pub fn summary(&self, id: Option<DatasetId>) -> Result<DatasetSummary> {
        match id {
            Some(id) => self.store.get(id),
            None => self.store.latest(),
        }
    }

    /// Records of `id` (or the latest dataset), sorted by name.
    pub fn data(&self, id: Option<DatasetId>) -> Result<Vec<EquipmentRecord>> {
        let id = self.resolve(id)?;
        self.store.get_records(id)
    }

    /// Summary and records of `id` (or the latest dataset).
    pub fn dataset(&self, id: Option<DatasetId>) -> Result<Dataset> {
        let summary = self.summary(id)?;
        let records = self.store.get_records(summary.id)?;
        Ok(Dataset { summary, records })
    }

    /// The retained datasets, most recent first.
    pub fn history(&self) -> Result<Vec<DatasetSummary>> {
        self.store.list_recent(self.options.retention.limit())
    }

    /// Report tables for `id` (or the latest dataset).
    pub fn report(&self, id: Option<DatasetId>) -> Result<Report> {
        let dataset = self.dataset(id)?;
        Ok(build_report(&dataset.summary, &dataset.records))
    }

    /// Compare two distinct datasets; see [`crate::processing::compare()`].
    pub fn compare(&self, a: DatasetId, b: DatasetId) -> Result<Comparison> {
        if a == b {
            return Err(Error::InvalidComparison { id: a });
        }
        let a = self.store.get(a)?;
        let b = self.store.get(b)?;
        compare(&a, &b)
    }

    /// Compare the latest dataset against every other retained dataset.
    pub fn compare_latest_with_history(&self) -> Result<Vec<Comparison>> {
        let history = self.history()?;
        let Some(latest) = history.first() else {
            return Err(crate::error::NotFound::NoDatasets.into());
        };
        Ok(compare_against(latest, &history))
    }

    fn resolve(&self, id: Option<DatasetId>) -> Result<DatasetId> {
        match id {
            Some(id) => Ok(id),
            None => Ok(self.store.latest()?.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotFound, StorageError};
    use crate::store::MemoryStore;

    const BODY: &[u8] = b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP2,Valve,1,10,20\nP1,Pump,5,50,200\n";

    /// Store whose atomic ingest always fails after validation.
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryStore,
    }

    impl DatasetStore for FailingStore {
        fn create(&self, dataset: NewDataset) -> Result<DatasetSummary> {
            self.inner.create(dataset)
        }
        fn create_retaining(
            &self,
            _dataset: NewDataset,
            _limit: usize,
        ) -> Result<(DatasetSummary, Vec<DatasetId>)> {
            Err(StorageError::Inconsistent("disk full".into()).into())
        }
        fn get(&self, id: DatasetId) -> Result<DatasetSummary> {
            self.inner.get(id)
        }
        fn get_records(&self, id: DatasetId) -> Result<Vec<EquipmentRecord>> {
            self.inner.get_records(id)
        }
        fn list_recent(&self, n: usize) -> Result<Vec<DatasetSummary>> {
            self.inner.list_recent(n)
        }
        fn delete(&self, id: DatasetId) -> Result<()> {
            self.inner.delete(id)
        }
        fn count(&self) -> Result<usize> {
            self.inner.count()
        }
    }

    #[test]
    fn ingest_returns_dataset_with_sorted_records() {
        let service = AnalyticsService::new(MemoryStore::new());
        let ds = service.ingest("plant.csv", BODY).unwrap();
        assert_eq!(ds.summary.filename, "plant.csv");
        assert_eq!(ds.summary.total_count, 2);
        assert_eq!(ds.records[0].name, "P1");
        assert_eq!(service.data(None).unwrap(), ds.records);
    }

    #[test]
    fn queries_on_empty_store_are_not_found() {
        let service = AnalyticsService::new(MemoryStore::new());
        assert!(matches!(service.summary(None), Err(Error::NotFound(NotFound::NoDatasets))));
        assert!(matches!(service.data(None), Err(Error::NotFound(NotFound::NoDatasets))));
        assert!(matches!(service.report(None), Err(Error::NotFound(NotFound::NoDatasets))));
        assert!(service.history().unwrap().is_empty());
    }

    #[test]
    fn compare_rejects_same_id_before_lookup() {
        let service = AnalyticsService::new(MemoryStore::new());
        let err = service.compare(DatasetId(9), DatasetId(9)).unwrap_err();
        assert!(matches!(err, Error::InvalidComparison { id } if id == DatasetId(9)));
    }

    #[test]
    fn storage_failure_fails_ingestion_and_keeps_store() {
        let service = AnalyticsService::new(FailingStore::default());
        let records = vec![EquipmentRecord::new("S", "Pump", 1.0, 1.0, 1.0)];
        let existing = service
            .store()
            .create(NewDataset {
                filename: "seed.csv".into(),
                stats: aggregate(&records).unwrap(),
                records,
            })
            .unwrap()
            .id;

        let err = service.ingest("b.csv", BODY).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(service.store().count().unwrap(), 1);
        assert_eq!(service.summary(None).unwrap().id, existing);
    }

    #[test]
    fn configured_retention_limit_is_applied_on_ingest() {
        let options = ServiceOptions {
            retention: RetentionManager::new(2),
            ..Default::default()
        };
        let service = AnalyticsService::with_options(MemoryStore::new(), options);
        let ids: Vec<DatasetId> = (0..4)
            .map(|i| service.ingest(&format!("{i}.csv"), BODY).unwrap().summary.id)
            .collect();

        let kept: Vec<DatasetId> = service.history().unwrap().iter().map(|s| s.id).collect();
        assert_eq!(kept, vec![ids[3], ids[2]]);
    }

    #[test]
    fn enforce_retention_trims_an_oversized_store() {
        let store = Arc::new(MemoryStore::new());
        let seeded = AnalyticsService::new(Arc::clone(&store));
        for i in 0..4 {
            seeded.ingest(&format!("{i}.csv"), BODY).unwrap();
        }

        let options = ServiceOptions {
            retention: RetentionManager::new(1),
            ..Default::default()
        };
        let service = AnalyticsService::with_options(Arc::clone(&store), options);
        assert_eq!(service.enforce_retention().unwrap().len(), 3);
        assert_eq!(store.count().unwrap(), 1);
        assert!(service.enforce_retention().unwrap().is_empty());
    }

    #[test]
    fn compare_latest_with_history_skips_latest() {
        let service = AnalyticsService::new(MemoryStore::new());
        let first = service.ingest("a.csv", BODY).unwrap().summary.id;
        let second = service.ingest("b.csv", BODY).unwrap().summary.id;
        let cmps = service.compare_latest_with_history().unwrap();
        assert_eq!(cmps.len(), 1);
        assert_eq!(cmps[0].dataset_a, second);
        assert_eq!(cmps[0].dataset_b, first);
    }
}
