//! `equipment-analytics` ingests CSV datasets of equipment measurements, keeps a bounded history of
//! recent uploads, and compares datasets by a capped performance score.
//!
//! The primary entrypoint is [`service::AnalyticsService`], which runs the whole pipeline over any
//! [`store::DatasetStore`]:
//!
//! ```text
//! payload -> schema check -> row parse -> aggregate -> store.create_retaining (atomic insert + evict)
//! ```
//!
//! ## What an upload must look like
//!
//! - The declared filename must end in `.csv` (case-sensitive).
//! - The header must contain `Equipment Name`, `Type`, `Flowrate`, `Pressure` and `Temperature`
//!   (any order, exact spelling, no surrounding whitespace). Extra columns are ignored.
//! - Every `Flowrate`/`Pressure`/`Temperature` cell must be a finite number. One bad cell rejects
//!   the whole upload and nothing is stored.
//! - At least one data row is required.
//!
//! ## Quick example
//!
//! ```rust
//! use equipment_analytics::service::AnalyticsService;
//! use equipment_analytics::store::SqliteStore;
//!
//! # fn main() -> Result<(), equipment_analytics::Error> {
//! let service = AnalyticsService::new(SqliteStore::open_in_memory()?);
//!
//! let a = service.ingest(
//!     "monday.csv",
//!     b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP1,Pump,5,50,200\nP2,Valve,1,10,20\n",
//! )?;
//! let b = service.ingest(
//!     "tuesday.csv",
//!     b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP1,Pump,5,50,200\n",
//! )?;
//!
//! assert_eq!(a.summary.avg_temperature, 110.0);
//! assert_eq!(service.history()?.len(), 2);
//!
//! let cmp = service.compare(a.summary.id, b.summary.id)?;
//! assert_eq!(cmp.winner, b.summary.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: format/header validation and CSV row parsing
//! - [`processing`]: aggregation and dataset comparison
//! - [`store`]: the dataset store contract plus SQLite and in-memory implementations
//! - [`retention`]: the five-dataset history bound
//! - [`report`]: the fixed tables handed to a report renderer
//! - [`service`]: the ingestion pipeline and read queries
//! - [`types`]: schema and data model types
//! - [`error`]: error types used across the crate

pub mod error;
pub mod ingestion;
pub mod processing;
pub mod report;
pub mod retention;
pub mod service;
pub mod store;
pub mod types;

pub use error::{Error, NotFound, Result, StorageError, ValidationError};
