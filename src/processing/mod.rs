//! Pure computations over parsed records and stored summaries.
//!
//! - [`aggregate()`]: count, means and type distribution of a record set
//! - [`compare()`]: capped performance scores, winner, gap and per-metric deltas of two summaries
//!
//! ## Example: aggregate → compare
//!
//! ```rust
//! use chrono::Utc;
//! use equipment_analytics::processing::{aggregate, compare};
//! use equipment_analytics::types::{DatasetId, DatasetSummary, EquipmentRecord};
//!
//! let stats = aggregate(&[
//!     EquipmentRecord::new("P1", "Pump", 5.0, 50.0, 200.0),
//!     EquipmentRecord::new("P2", "Valve", 1.0, 10.0, 20.0),
//! ])
//! .unwrap();
//! assert_eq!(stats.avg_flowrate, 3.0);
//!
//! let summary = |id| DatasetSummary {
//!     id: DatasetId(id),
//!     filename: "plant.csv".into(),
//!     uploaded_at: Utc::now(),
//!     total_count: stats.total_count,
//!     avg_flowrate: stats.avg_flowrate,
//!     avg_pressure: stats.avg_pressure,
//!     avg_temperature: stats.avg_temperature,
//!     type_distribution: stats.type_distribution.clone(),
//! };
//! let cmp = compare(&summary(1), &summary(2)).unwrap();
//! assert_eq!(cmp.gap, 0.0);
//! assert_eq!(cmp.winner, DatasetId(1));
//! ```

pub mod aggregate;
pub mod compare;

pub use aggregate::aggregate;
pub use compare::{
    AlignedSeries, Comparison, Metric, MetricDelta, Side, Trend, compare, compare_against,
    metric_score, performance_score,
};
