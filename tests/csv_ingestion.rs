use equipment_analytics::ingestion::csv::{parse_csv_from_path, parse_csv_from_reader};
use equipment_analytics::ingestion::{parse_path, parse_payload};
use equipment_analytics::types::EquipmentRecord;
use equipment_analytics::{Error, ValidationError};

#[test]
fn parse_csv_from_path_happy_path() {
    let records = parse_csv_from_path("tests/fixtures/equipment.csv").unwrap();

    assert_eq!(records.len(), 6);
    assert_eq!(
        records[0],
        EquipmentRecord::new("Pump-1", "Pump", 120.5, 5.2, 110.0)
    );
}

#[test]
fn parse_csv_allows_reordered_columns() {
    let input = "Type,Temperature,Equipment Name,Pressure,Flowrate\nPump,200,P1,50,5\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let records = parse_csv_from_reader(&mut rdr).unwrap();
    assert_eq!(records, vec![EquipmentRecord::new("P1", "Pump", 5.0, 50.0, 200.0)]);
}

#[test]
fn parse_csv_errors_on_missing_required_column() {
    let err = parse_csv_from_path("tests/fixtures/missing_pressure.csv").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("validation error"));
    assert!(msg.contains("missing required columns: Pressure"));
    match err {
        Error::Validation(ValidationError::MissingColumns { missing }) => {
            assert_eq!(missing, vec!["Pressure".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parse_csv_errors_on_type_parse() {
    let err = parse_csv_from_path("tests/fixtures/bad_flowrate_row3.csv").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value at row 3"));
    assert!(msg.contains("column 'Flowrate'"));
    assert!(msg.contains("raw='n/a'"));
}

#[test]
fn header_names_are_case_sensitive() {
    let body = b"equipment name,type,flowrate,pressure,temperature\nP1,Pump,1,2,3\n";
    let err = parse_payload("lower.csv", body).unwrap_err();
    match err {
        Error::Validation(ValidationError::MissingColumns { missing }) => {
            assert_eq!(
                missing,
                vec!["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parse_payload_rejects_non_csv_names() {
    let body = b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP1,Pump,1,2,3\n";
    let err = parse_payload("upload.xlsx", body).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::BadFormat { ref filename }) if filename == "upload.xlsx"
    ));
    assert!(err.to_string().contains("expected a .csv file"));
}

#[test]
fn parse_path_uses_file_name_as_declared_name() {
    let (filename, records) = parse_path("tests/fixtures/equipment.csv").unwrap();
    assert_eq!(filename, "equipment.csv");
    assert_eq!(records.len(), 6);
}

#[test]
fn parse_path_reports_missing_file_as_io() {
    let err = parse_path("tests/fixtures/does_not_exist.csv").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
