//! Unified ingestion entrypoint.
//!
//! [`parse_payload`] checks the declared format, validates the header and parses every row. It
//! does not aggregate or persist; see [`crate::service::AnalyticsService::ingest`] for the full
//! pipeline.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::EquipmentRecord;

use super::csv;
use super::schema::{IngestionFormat, validate_format};

/// Parse an uploaded payload, dispatching on the format implied by `filename`.
///
/// ```
/// use equipment_analytics::ingestion::parse_payload;
///
/// let body = b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP1,Pump,5,50,200\n";
/// let records = parse_payload("plant.csv", body).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].equipment_type, "Pump");
/// ```
pub fn parse_payload(filename: &str, bytes: &[u8]) -> Result<Vec<EquipmentRecord>> {
    match validate_format(filename)? {
        IngestionFormat::Csv => csv::parse_csv_bytes(bytes),
    }
}

/// Read a file and parse it with [`parse_payload`], using the file name as the declared name.
///
/// Returns the declared file name alongside the records.
pub fn parse_path(path: impl AsRef<Path>) -> Result<(String, Vec<EquipmentRecord>)> {
    let path = path.as_ref();
    let filename = declared_filename(path)?;
    // Reject by extension before touching the file system.
    validate_format(&filename)?;
    let bytes = std::fs::read(path)?;
    let records = parse_payload(&filename, &bytes)?;
    Ok((filename, records))
}

/// The last path component, as the uploader would have declared it.
pub fn declared_filename(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path has no file name ({})", path.display()),
            ))
        })
}
