//! Ingestion entrypoints and implementations.
//!
//! Ingestion runs in three steps:
//!
//! - [`schema`]: the declared format and header row are checked before any row is read
//! - [`csv`]: rows are parsed into typed [`crate::types::EquipmentRecord`]s, all-or-nothing
//! - [`observability`]: outcomes are reported to an optional [`IngestionObserver`]
//!
//! Most callers should use [`parse_payload`] (from [`unified`]) or the full pipeline in
//! [`crate::service`].

pub mod csv;
pub mod observability;
pub mod schema;
pub mod unified;

pub use observability::{
    CompositeObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use schema::{ColumnMap, IngestionFormat, validate_format, validate_headers};
pub use unified::{declared_filename, parse_path, parse_payload};
