use thiserror::Error;

use crate::types::DatasetId;

/// Convenience result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type returned by ingestion, storage, query and comparison operations.
///
/// Every variant is terminal for the call that produced it; nothing is retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload's declared format or header row is unacceptable.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A measurement value could not be parsed as a finite number.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    Parse {
        /// 1-based data row index (the header row is not counted).
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// The payload had a valid header but no data rows.
    #[error("dataset contains no data rows")]
    EmptyDataset,

    /// The requested dataset does not exist (unknown, evicted, or the store is empty).
    #[error("not found: {0}")]
    NotFound(#[from] NotFound),

    /// Both sides of a comparison refer to the same dataset.
    #[error("cannot compare dataset {id} with itself")]
    InvalidComparison { id: DatasetId },

    /// Malformed CSV framing (e.g. invalid UTF-8).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset store failed; the store is left as it was before the call.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Schema-level rejection of an ingestion payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required header fields are absent. Lists every missing field.
    #[error("missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// The declared file type is not CSV.
    #[error("invalid file type for '{filename}': expected a .csv file")]
    BadFormat { filename: String },
}

/// What could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("dataset {0} not found")]
    Dataset(DatasetId),
    #[error("no datasets available")]
    NoDatasets,
}

/// Failure modes of a [`crate::store::DatasetStore`] implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored or submitted data violates a store invariant.
    #[error("inconsistent data: {0}")]
    Inconsistent(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(StorageError::Sqlite(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(StorageError::Serialization(err))
    }
}

impl Error {
    /// Returns true when the error means the dataset (or any dataset) is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
