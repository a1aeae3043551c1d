//! Cross-dataset comparison by capped performance score.
//!
//! Everything here is a pure function of [`DatasetSummary`] values; nothing touches the store.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{DatasetId, DatasetSummary};

/// Average flowrate at which the flowrate score saturates.
pub const FLOWRATE_CAP: f64 = 5.0;
/// Average pressure at which the pressure score saturates.
pub const PRESSURE_CAP: f64 = 50.0;
/// Average temperature at which the temperature score saturates.
pub const TEMPERATURE_CAP: f64 = 200.0;

/// A scored measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Flowrate,
    Pressure,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Flowrate, Metric::Pressure, Metric::Temperature];

    /// Value at which this metric's score saturates at 100.
    pub fn cap(self) -> f64 {
        match self {
            Metric::Flowrate => FLOWRATE_CAP,
            Metric::Pressure => PRESSURE_CAP,
            Metric::Temperature => TEMPERATURE_CAP,
        }
    }

    /// The dataset average for this metric.
    pub fn average(self, summary: &DatasetSummary) -> f64 {
        match self {
            Metric::Flowrate => summary.avg_flowrate,
            Metric::Pressure => summary.avg_pressure,
            Metric::Temperature => summary.avg_temperature,
        }
    }

    /// Chart label for the metric's average.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Flowrate => "Avg Flowrate",
            Metric::Pressure => "Avg Pressure",
            Metric::Temperature => "Avg Temperature",
        }
    }
}

/// Direction of a per-metric difference, first operand relative to second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

/// Which operand of [`compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    First,
    Second,
}

/// Difference of one metric between the two datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: Metric,
    pub value_a: f64,
    pub value_b: f64,
    /// `value_a - value_b`.
    pub diff: f64,
    /// `diff / value_b * 100`, or `0.0` when `value_b` is zero.
    pub percent_change: f64,
    pub trend: Trend,
}

/// Two aligned series over a shared label axis, ready for a grouped bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries<T> {
    pub labels: Vec<String>,
    pub values_a: Vec<T>,
    pub values_b: Vec<T>,
}

/// Result of comparing dataset A against dataset B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub dataset_a: DatasetId,
    pub dataset_b: DatasetId,
    pub score_a: f64,
    pub score_b: f64,
    pub winner: DatasetId,
    pub winner_side: Side,
    /// `|score_a - score_b|`.
    pub gap: f64,
    /// `total_count_a - total_count_b`.
    pub count_diff: i64,
    /// One entry per [`Metric::ALL`], in that order.
    pub deltas: Vec<MetricDelta>,
    /// Type counts over the sorted union of both datasets' types; absent types count 0.
    pub type_distribution: AlignedSeries<u64>,
    /// The three metric averages side by side.
    pub parameters: AlignedSeries<f64>,
}

impl Comparison {
    /// Delta for a single metric.
    pub fn delta(&self, metric: Metric) -> Option<&MetricDelta> {
        self.deltas.iter().find(|d| d.metric == metric)
    }
}

/// Score of one metric: `min(value / cap, 1) * 100`.
pub fn metric_score(metric: Metric, value: f64) -> f64 {
    (value / metric.cap()).min(1.0) * 100.0
}

/// Composite 0..=100 score: the mean of the three capped metric scores.
pub fn performance_score(summary: &DatasetSummary) -> f64 {
    let total: f64 = Metric::ALL
        .iter()
        .map(|&m| metric_score(m, m.average(summary)))
        .sum();
    total / Metric::ALL.len() as f64
}

/// Compare two distinct datasets.
///
/// The winner is the dataset with the strictly higher score. Equal scores go to `a`.
pub fn compare(a: &DatasetSummary, b: &DatasetSummary) -> Result<Comparison> {
    if a.id == b.id {
        return Err(Error::InvalidComparison { id: a.id });
    }
    Ok(compare_distinct(a, b))
}

fn compare_distinct(a: &DatasetSummary, b: &DatasetSummary) -> Comparison {
    let score_a = performance_score(a);
    let score_b = performance_score(b);
    let winner_side = if score_b > score_a { Side::Second } else { Side::First };
    let winner = match winner_side {
        Side::First => a.id,
        Side::Second => b.id,
    };

    let deltas = Metric::ALL
        .iter()
        .map(|&m| metric_delta(m, m.average(a), m.average(b)))
        .collect();

    let parameters = AlignedSeries {
        labels: Metric::ALL.iter().map(|m| m.label().to_string()).collect(),
        values_a: Metric::ALL.iter().map(|m| m.average(a)).collect(),
        values_b: Metric::ALL.iter().map(|m| m.average(b)).collect(),
    };

    Comparison {
        dataset_a: a.id,
        dataset_b: b.id,
        score_a,
        score_b,
        winner,
        winner_side,
        gap: (score_a - score_b).abs(),
        count_diff: a.total_count as i64 - b.total_count as i64,
        deltas,
        type_distribution: merge_distributions(a, b),
        parameters,
    }
}

/// Compare `baseline` against each of `others` in parallel, skipping `baseline` itself.
///
/// Results keep the order of `others`.
pub fn compare_against(baseline: &DatasetSummary, others: &[DatasetSummary]) -> Vec<Comparison> {
    others
        .par_iter()
        .filter(|other| other.id != baseline.id)
        .map(|other| compare_distinct(baseline, other))
        .collect()
}

fn metric_delta(metric: Metric, value_a: f64, value_b: f64) -> MetricDelta {
    let diff = value_a - value_b;
    let percent_change = if value_b == 0.0 { 0.0 } else { diff / value_b * 100.0 };
    MetricDelta {
        metric,
        value_a,
        value_b,
        diff,
        percent_change,
        trend: if diff >= 0.0 { Trend::Up } else { Trend::Down },
    }
}

fn merge_distributions(a: &DatasetSummary, b: &DatasetSummary) -> AlignedSeries<u64> {
    let labels: BTreeSet<&String> = a
        .type_distribution
        .keys()
        .chain(b.type_distribution.keys())
        .collect();

    let count = |s: &DatasetSummary, t: &str| s.type_distribution.get(t).copied().unwrap_or(0);
    AlignedSeries {
        values_a: labels.iter().map(|t| count(a, t)).collect(),
        values_b: labels.iter().map(|t| count(b, t)).collect(),
        labels: labels.into_iter().cloned().collect(),
    }
}
