//! The fixed tables handed to the report renderer.
//!
//! This module owns table content and ordering only; layout belongs to the renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DatasetId, DatasetSummary, EquipmentRecord, sort_by_name};

/// Report title.
pub const REPORT_TITLE: &str = "Chemical Equipment Parameter Report";

/// A header row plus body rows of preformatted cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Everything the renderer needs for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub dataset_id: DatasetId,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    /// Suggested download name for the rendered document.
    pub document_name: String,
    pub summary: Table,
    pub type_distribution: Table,
    pub equipment: Table,
}

/// Build the summary-metrics, type-distribution and per-record tables.
///
/// Averages and measurements use two decimals. Types are ordered by count descending, then name;
/// records are ordered by name.
pub fn build_report(summary: &DatasetSummary, records: &[EquipmentRecord]) -> Report {
    let mut metrics = Table::new(&["Metric", "Value"]);
    metrics.push(vec!["Total Equipment Count".into(), summary.total_count.to_string()]);
    metrics.push(vec!["Average Flowrate".into(), format!("{:.2}", summary.avg_flowrate)]);
    metrics.push(vec!["Average Pressure".into(), format!("{:.2}", summary.avg_pressure)]);
    metrics.push(vec!["Average Temperature".into(), format!("{:.2}", summary.avg_temperature)]);

    let mut types: Vec<(&String, &u64)> = summary.type_distribution.iter().collect();
    types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let mut type_table = Table::new(&["Equipment Type", "Count"]);
    for (name, count) in types {
        type_table.push(vec![name.clone(), count.to_string()]);
    }

    let mut sorted = records.to_vec();
    sort_by_name(&mut sorted);
    let mut equipment = Table::new(&["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"]);
    for r in &sorted {
        equipment.push(vec![
            r.name.clone(),
            r.equipment_type.clone(),
            format!("{:.2}", r.flowrate),
            format!("{:.2}", r.pressure),
            format!("{:.2}", r.temperature),
        ]);
    }

    Report {
        title: REPORT_TITLE.to_string(),
        dataset_id: summary.id,
        filename: summary.filename.clone(),
        uploaded_at: summary.uploaded_at,
        document_name: format!("equipment_report_{}.pdf", summary.id),
        summary: metrics,
        type_distribution: type_table,
        equipment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::aggregate;

    #[test]
    fn tables_have_expected_content_and_order() {
        let records = vec![
            EquipmentRecord::new("Valve-1", "Valve", 1.0, 10.0, 20.0),
            EquipmentRecord::new("Pump-2", "Pump", 5.126, 50.0, 200.0),
            EquipmentRecord::new("Pump-1", "Pump", 4.0, 40.0, 180.0),
            EquipmentRecord::new("Compressor-1", "Compressor", 2.0, 30.0, 90.0),
        ];
        let stats = aggregate(&records).unwrap();
        let summary = DatasetSummary {
            id: DatasetId(12),
            filename: "plant.csv".into(),
            uploaded_at: Utc::now(),
            total_count: stats.total_count,
            avg_flowrate: stats.avg_flowrate,
            avg_pressure: stats.avg_pressure,
            avg_temperature: stats.avg_temperature,
            type_distribution: stats.type_distribution,
        };

        let report = build_report(&summary, &records);
        assert_eq!(report.title, REPORT_TITLE);
        assert_eq!(report.document_name, "equipment_report_12.pdf");

        assert_eq!(report.summary.rows[0], vec!["Total Equipment Count", "4"]);
        assert_eq!(report.summary.rows[2], vec!["Average Pressure", "32.50"]);

        let types: Vec<&str> = report.type_distribution.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(types, vec!["Pump", "Compressor", "Valve"]);

        let names: Vec<&str> = report.equipment.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["Compressor-1", "Pump-1", "Pump-2", "Valve-1"]);
        assert_eq!(report.equipment.headers.len(), 5);
        assert_eq!(report.equipment.rows[2][2], "5.13");
    }
}
