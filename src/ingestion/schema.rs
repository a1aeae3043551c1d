//! Payload checks that run before any row body is read.

use crate::error::{Result, ValidationError};
use crate::types::{COL_FLOWRATE, COL_NAME, COL_PRESSURE, COL_TEMPERATURE, COL_TYPE, Schema};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
}

impl IngestionFormat {
    /// Format implied by a declared filename.
    ///
    /// The suffix check is case-sensitive: `plant.csv` is CSV, `PLANT.CSV` is not. A bare `.csv`
    /// counts as CSV.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename.ends_with(".csv").then_some(Self::Csv)
    }
}

/// Infer the payload format from its declared filename; see [`IngestionFormat::from_filename`].
pub fn validate_format(filename: &str) -> Result<IngestionFormat> {
    IngestionFormat::from_filename(filename).ok_or_else(|| {
        ValidationError::BadFormat {
            filename: filename.to_owned(),
        }
        .into()
    })
}

/// Header position of each required equipment column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    pub equipment_type: usize,
    pub flowrate: usize,
    pub pressure: usize,
    pub temperature: usize,
}

/// Map every schema field to its header index (allows re-ordered columns).
///
/// Fails with [`ValidationError::MissingColumns`] listing *all* absent fields, in schema order.
/// Header cells must match exactly, including surrounding whitespace. Only a leading UTF-8 byte
/// order mark on the first cell is dropped.
pub fn map_columns<'a, I>(headers: I, schema: &Schema) -> Result<Vec<usize>>
where
    I: IntoIterator<Item = &'a str>,
{
    let headers: Vec<&str> = headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}') } else { h })
        .collect();

    let mut idxs = Vec::with_capacity(schema.columns.len());
    let mut missing = Vec::new();
    for column in schema.column_names() {
        match headers.iter().position(|h| *h == column) {
            Some(idx) => idxs.push(idx),
            None => missing.push(column.to_owned()),
        }
    }

    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns { missing }.into());
    }
    Ok(idxs)
}

/// Validate a header row against the equipment schema.
pub fn validate_headers<'a, I>(headers: I) -> Result<ColumnMap>
where
    I: IntoIterator<Item = &'a str>,
{
    let schema = Schema::equipment();
    let idxs = map_columns(headers, &schema)?;
    let at = |name: &str| {
        schema
            .index_of(name)
            .map(|i| idxs[i])
            .unwrap_or_default()
    };
    Ok(ColumnMap {
        name: at(COL_NAME),
        equipment_type: at(COL_TYPE),
        flowrate: at(COL_FLOWRATE),
        pressure: at(COL_PRESSURE),
        temperature: at(COL_TEMPERATURE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn format_is_inferred_from_suffix() {
        assert_eq!(validate_format("data.csv").unwrap(), IngestionFormat::Csv);
        assert_eq!(validate_format("archive.tar.csv").unwrap(), IngestionFormat::Csv);
        assert_eq!(validate_format(".csv").unwrap(), IngestionFormat::Csv);
    }

    #[test]
    fn non_csv_is_bad_format() {
        for name in ["data.xlsx", "data", "csv", "DATA.CSV", "data.Csv", "data.csv.bak"] {
            let err = validate_format(name).unwrap_err();
            assert!(
                matches!(err, Error::Validation(ValidationError::BadFormat { ref filename }) if filename == name),
                "unexpected error for {name}: {err}"
            );
        }
    }

    #[test]
    fn reordered_headers_are_mapped() {
        let map = validate_headers([
            "Temperature",
            "Type",
            "Equipment Name",
            "Pressure",
            "Flowrate",
        ])
        .unwrap();
        assert_eq!(
            map,
            ColumnMap {
                name: 2,
                equipment_type: 1,
                flowrate: 4,
                pressure: 3,
                temperature: 0,
            }
        );
    }

    #[test]
    fn every_missing_column_is_reported() {
        let err = validate_headers(["Equipment Name", "type", "Flowrate"]).unwrap_err();
        match err {
            Error::Validation(ValidationError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Type", "Pressure", "Temperature"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn padded_header_names_do_not_match() {
        let err = validate_headers([" Equipment Name", "Type ", "Flowrate", "Pressure", "Temperature"])
            .unwrap_err();
        match err {
            Error::Validation(ValidationError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Equipment Name", "Type"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        let map = validate_headers([
            "\u{feff}Equipment Name",
            "Type",
            "Flowrate",
            "Pressure",
            "Temperature",
        ])
        .unwrap();
        assert_eq!(map.name, 0);
    }
}
