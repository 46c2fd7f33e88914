//! Summary statistics over a processed batch.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::category::AqiCategory;
use crate::observation::ProcessedRow;
use crate::pollutant::Pollutant;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Aggregate view of a batch's composite AQI.
///
/// `mean`, `stddev`, `min` and `max` only cover rows with a defined AQI and
/// are `None` when there are none.
#[derive(Debug, Serialize)]
pub struct AqiSummary {
    pub rows: usize,
    pub defined: usize,
    pub undefined: usize,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub categories: BTreeMap<AqiCategory, usize>,
    pub dominant_pollutants: BTreeMap<Pollutant, usize>,
}

impl AqiSummary {
    pub fn from_rows(rows: &[ProcessedRow]) -> Self {
        let values: Vec<f64> = rows.iter().filter_map(|r| r.calculated_aqi).collect();

        let mut categories = BTreeMap::new();
        for &v in &values {
            *categories.entry(AqiCategory::from_aqi(v)).or_default() += 1;
        }

        let mut dominant_pollutants = BTreeMap::new();
        for p in rows.iter().filter_map(|r| r.dominant_pollutant) {
            *dominant_pollutants.entry(p).or_default() += 1;
        }

        let (mean, stddev) = if values.is_empty() {
            (None, None)
        } else {
            let m = mean(&values);
            (Some(m), Some(stddev(&values, m)))
        };

        AqiSummary {
            rows: rows.len(),
            defined: values.len(),
            undefined: rows.len() - values.len(),
            mean,
            stddev,
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            categories,
            dominant_pollutants,
        }
    }
}
