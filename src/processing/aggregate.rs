//! Summary statistics over parsed [`EquipmentRecord`]s.

use crate::error::{Error, Result};
use crate::types::{DatasetStats, EquipmentRecord, TypeDistribution};

#[derive(Default)]
struct Acc {
    count: u64,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
    types: TypeDistribution,
}

/// Compute count, the three arithmetic means and the type distribution of `records`.
///
/// Returns [`Error::EmptyDataset`] for an empty slice, since the means would be undefined.
/// The distribution values always sum to `total_count`. Means of finite inputs are finite: if the
/// plain sum overflows, the mean is recomputed from pre-divided values.
pub fn aggregate(records: &[EquipmentRecord]) -> Result<DatasetStats> {
    if records.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let acc = records.iter().fold(Acc::default(), |mut acc, r| {
        acc.count += 1;
        acc.flowrate += r.flowrate;
        acc.pressure += r.pressure;
        acc.temperature += r.temperature;
        *acc.types.entry(r.equipment_type.clone()).or_insert(0) += 1;
        acc
    });

    let n = acc.count as f64;
    Ok(DatasetStats {
        total_count: acc.count,
        avg_flowrate: mean(acc.flowrate, n, records, |r| r.flowrate),
        avg_pressure: mean(acc.pressure, n, records, |r| r.pressure),
        avg_temperature: mean(acc.temperature, n, records, |r| r.temperature),
        type_distribution: acc.types,
    })
}

fn mean(
    sum: f64,
    n: f64,
    records: &[EquipmentRecord],
    value: fn(&EquipmentRecord) -> f64,
) -> f64 {
    if sum.is_finite() {
        return sum / n;
    }
    // Each term is at most max|x| / n, so no partial sum can overflow.
    records.iter().map(|r| value(r) / n).sum()
}
