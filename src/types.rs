//! Core data model types.
//!
//! Ingestion checks a payload against a [`Schema`] (the required column names), parses rows into
//! [`EquipmentRecord`]s and aggregates them into a [`DatasetSummary`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header name of the equipment name column.
pub const COL_NAME: &str = "Equipment Name";
/// Header name of the equipment type column.
pub const COL_TYPE: &str = "Type";
/// Header name of the flowrate column.
pub const COL_FLOWRATE: &str = "Flowrate";
/// Header name of the pressure column.
pub const COL_PRESSURE: &str = "Pressure";
/// Header name of the temperature column.
pub const COL_TEMPERATURE: &str = "Temperature";

/// The ordered column names an upload must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Column names, matched exactly against the header.
    pub columns: Vec<String>,
}

impl Schema {
    /// Create a new schema from column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The five required equipment columns, in canonical order.
    pub fn equipment() -> Self {
        Self::new([COL_NAME, COL_TYPE, COL_FLOWRATE, COL_PRESSURE, COL_TEMPERATURE])
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Store-assigned dataset identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub i64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(DatasetId)
    }
}

/// Equipment type -> number of records of that type.
pub type TypeDistribution = BTreeMap<String, u64>;

/// One measured piece of equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl EquipmentRecord {
    pub fn new(
        name: impl Into<String>,
        equipment_type: impl Into<String>,
        flowrate: f64,
        pressure: f64,
        temperature: f64,
    ) -> Self {
        Self {
            name: name.into(),
            equipment_type: equipment_type.into(),
            flowrate,
            pressure,
            temperature,
        }
    }
}

/// Aggregate description of one ingested dataset.
///
/// Aggregates are computed once at ingestion and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: DatasetId,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub total_count: u64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: TypeDistribution,
}

/// Aggregated statistics over a set of records, before the store assigns identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_count: u64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: TypeDistribution,
}

/// Everything [`crate::store::DatasetStore::create`] persists in one atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataset {
    pub filename: String,
    pub stats: DatasetStats,
    pub records: Vec<EquipmentRecord>,
}

impl NewDataset {
    /// Build the summary the store will persist, given its assigned identity.
    pub fn into_summary(self, id: DatasetId, uploaded_at: DateTime<Utc>) -> (DatasetSummary, Vec<EquipmentRecord>) {
        let DatasetStats {
            total_count,
            avg_flowrate,
            avg_pressure,
            avg_temperature,
            type_distribution,
        } = self.stats;
        let summary = DatasetSummary {
            id,
            filename: self.filename,
            uploaded_at,
            total_count,
            avg_flowrate,
            avg_pressure,
            avg_temperature,
            type_distribution,
        };
        (summary, self.records)
    }
}

/// A dataset summary together with its records, sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(flatten)]
    pub summary: DatasetSummary,
    pub records: Vec<EquipmentRecord>,
}

/// Sort records by name; ties keep their original order.
pub fn sort_by_name(records: &mut [EquipmentRecord]) {
    records.sort_by(|a, b| a.name.cmp(&b.name));
}
