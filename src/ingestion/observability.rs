use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::Error;
use crate::types::DatasetId;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the payload was rejected).
    Error,
    /// Critical error (I/O or storage failures).
    Critical,
}

impl IngestionSeverity {
    /// Classify an ingestion failure.
    pub fn for_error(e: &Error) -> Self {
        match e {
            Error::Io(_) | Error::Storage(_) => IngestionSeverity::Critical,
            Error::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
                _ => IngestionSeverity::Error,
            },
            Error::Validation(_)
            | Error::Parse { .. }
            | Error::EmptyDataset
            | Error::NotFound(_)
            | Error::InvalidComparison { .. } => IngestionSeverity::Error,
        }
    }
}

/// Context about an ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Filename declared by the uploader.
    pub filename: String,
    /// Payload size in bytes.
    pub bytes: usize,
}

/// Stats reported on successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionStats {
    /// The created dataset.
    pub dataset_id: DatasetId,
    /// Number of ingested rows.
    pub rows: usize,
    /// Datasets evicted by retention as part of this ingestion.
    pub evicted: Vec<DatasetId>,
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when ingestion succeeds.
    fn on_success(&self, _ctx: &IngestionContext, _stats: &IngestionStats) {}

    /// Called when ingestion fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &Error) {}

    /// Called when an ingestion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &Error) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: &IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &Error) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &Error) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits ingestion events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: &IngestionStats) {
        info!(
            filename = %ctx.filename,
            bytes = ctx.bytes,
            dataset_id = %stats.dataset_id,
            rows = stats.rows,
            evicted = ?stats.evicted,
            "ingest ok"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &Error) {
        warn!(
            filename = %ctx.filename,
            bytes = ctx.bytes,
            ?severity,
            %error,
            "ingest failed"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &Error) {
        error!(
            filename = %ctx.filename,
            bytes = ctx.bytes,
            ?severity,
            %error,
            "ALERT ingest failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotFound, StorageError, ValidationError};

    #[test]
    fn storage_and_io_failures_are_critical() {
        let storage = Error::Storage(StorageError::Inconsistent("x".into()));
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(IngestionSeverity::for_error(&storage), IngestionSeverity::Critical);
        assert_eq!(IngestionSeverity::for_error(&io), IngestionSeverity::Critical);
    }

    #[test]
    fn payload_rejections_are_errors() {
        let missing = Error::Validation(ValidationError::MissingColumns {
            missing: vec!["Pressure".into()],
        });
        assert_eq!(IngestionSeverity::for_error(&missing), IngestionSeverity::Error);
        assert_eq!(
            IngestionSeverity::for_error(&Error::EmptyDataset),
            IngestionSeverity::Error
        );
        assert_eq!(
            IngestionSeverity::for_error(&Error::NotFound(NotFound::NoDatasets)),
            IngestionSeverity::Error
        );
        assert!(IngestionSeverity::Critical > IngestionSeverity::Error);
    }
}
