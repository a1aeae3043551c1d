//! CSV row parsing into [`EquipmentRecord`]s.

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{COL_FLOWRATE, COL_PRESSURE, COL_TEMPERATURE, EquipmentRecord};

use super::schema::{ColumnMap, validate_headers};

/// Parse CSV bytes into equipment records.
///
/// Rules:
///
/// - CSV must have headers containing every required equipment column (order can differ).
/// - Every measurement must parse as a finite `f64`.
/// - The first bad row aborts the whole parse; there is no partial result.
/// - A header with no data rows fails with [`Error::EmptyDataset`].
pub fn parse_csv_bytes(bytes: &[u8]) -> Result<Vec<EquipmentRecord>> {
    let mut rdr = reader_builder().from_reader(bytes);
    parse_csv_from_reader(&mut rdr)
}

/// Parse a CSV file into equipment records.
pub fn parse_csv_from_path(path: impl AsRef<Path>) -> Result<Vec<EquipmentRecord>> {
    let mut rdr = reader_builder().from_path(path)?;
    parse_csv_from_reader(&mut rdr)
}

/// Parse equipment records from an existing CSV reader.
pub fn parse_csv_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<EquipmentRecord>> {
    let headers = rdr.headers()?.clone();
    let cols = validate_headers(headers.iter())?;

    let mut records = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based data row number; the header is not counted.
        let row = row_idx0 + 1;
        let record = result?;
        records.push(parse_row(row, &record, &cols)?);
    }

    if records.is_empty() {
        return Err(Error::EmptyDataset);
    }
    Ok(records)
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    builder
}

fn parse_row(row: usize, record: &csv::StringRecord, cols: &ColumnMap) -> Result<EquipmentRecord> {
    let cell = |idx: usize| record.get(idx).unwrap_or("");
    Ok(EquipmentRecord {
        name: cell(cols.name).to_owned(),
        equipment_type: cell(cols.equipment_type).to_owned(),
        flowrate: parse_measurement(row, COL_FLOWRATE, cell(cols.flowrate))?,
        pressure: parse_measurement(row, COL_PRESSURE, cell(cols.pressure))?,
        temperature: parse_measurement(row, COL_TEMPERATURE, cell(cols.temperature))?,
    })
}

fn parse_measurement(row: usize, column: &str, raw: &str) -> Result<f64> {
    let parse_err = |message: String| Error::Parse {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(parse_err("missing value".to_string()));
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|e| parse_err(e.to_string()))?;
    if !value.is_finite() {
        return Err(parse_err("expected a finite number".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    const HEADER: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n";

    #[test]
    fn parses_rows_and_keeps_strings_verbatim() {
        let input = format!("{HEADER} P1 , Pump ,5, 50 ,200\nV1,Valve,1.5,10,20.25\n");
        let records = parse_csv_bytes(input.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                EquipmentRecord::new(" P1 ", " Pump ", 5.0, 50.0, 200.0),
                EquipmentRecord::new("V1", "Valve", 1.5, 10.0, 20.25),
            ]
        );
    }

    #[test]
    fn extra_columns_are_ignored() {
        let input = "Notes,Equipment Name,Type,Flowrate,Pressure,Temperature\nhot,P1,Pump,1,2,3\n";
        let records = parse_csv_bytes(input.as_bytes()).unwrap();
        assert_eq!(records, vec![EquipmentRecord::new("P1", "Pump", 1.0, 2.0, 3.0)]);
    }

    #[test]
    fn header_only_is_empty_dataset() {
        let err = parse_csv_bytes(HEADER.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset));
    }

    #[test]
    fn missing_columns_fail_before_rows_are_read() {
        // The body would fail to parse; the header check must win.
        let input = "Equipment Name,Type,Flowrate\nP1,Pump,abc\n";
        let err = parse_csv_bytes(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingColumns { .. })
        ));
    }

    #[test]
    fn non_numeric_value_reports_row_and_column() {
        let input = format!("{HEADER}P1,Pump,1,2,3\nP2,Pump,1,2,3\nP3,Pump,fast,2,3\n");
        let err = parse_csv_bytes(input.as_bytes()).unwrap_err();
        match err {
            Error::Parse { row, column, raw, .. } => {
                assert_eq!(row, 3);
                assert_eq!(column, "Flowrate");
                assert_eq!(raw, "fast");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_and_blank_values_are_rejected() {
        let nan = format!("{HEADER}P1,Pump,1,NaN,3\n");
        assert!(matches!(
            parse_csv_bytes(nan.as_bytes()).unwrap_err(),
            Error::Parse { row: 1, ref column, .. } if column == "Pressure"
        ));

        let short = format!("{HEADER}P1,Pump,1,2\n");
        assert!(matches!(
            parse_csv_bytes(short.as_bytes()).unwrap_err(),
            Error::Parse { row: 1, ref column, .. } if column == "Temperature"
        ));
    }
}
