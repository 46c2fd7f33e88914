//! Model-ready features derived from processed rows.
//!
//! Applied after AQI derivation: log transforms for skewed pollutants,
//! min-max scaling over the batch, then 1%/99% capping of the scaled
//! log columns. Nulls are skipped when fitting and stay null.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::observation::ProcessedRow;

pub const LOWER_QUANTILE: f64 = 0.01;
pub const UPPER_QUANTILE: f64 = 0.99;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub month: u32,
    pub calculated_aqi: Option<f64>,
    pub aqi_change_rate: Option<f64>,
    pub co_scaled: Option<f64>,
    pub no_log_scaled: Option<f64>,
    pub no2_scaled: Option<f64>,
    pub o3_scaled: Option<f64>,
    pub so2_log_scaled: Option<f64>,
    pub nh3_log_scaled: Option<f64>,
    pub hour_scaled: Option<f64>,
    pub day_scaled: Option<f64>,
}

/// `ln(1 + x)`; values at or below -1 have no log and become null.
pub fn log1p(value: Option<f64>) -> Option<f64> {
    value.map(f64::ln_1p).filter(|v| v.is_finite())
}

/// Scales to `[0, 1]` using the column's own min and max.
/// A constant column maps to 0.
pub fn min_max_scale(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present = values.iter().flatten().copied();
    let Some(min) = present.clone().reduce(f64::min) else {
        return values.to_vec();
    };
    let max = present.reduce(f64::max).unwrap_or(min);
    let range = if max > min { max - min } else { 1.0 };

    values.iter().map(|v| v.map(|x| (x - min) / range)).collect()
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Clips every value to the `[lower_q, upper_q]` quantile range of the column.
pub fn winsorize(values: &mut [Option<f64>], lower_q: f64, upper_q: f64) {
    let (Some(lower), Some(upper)) = (quantile(values, lower_q), quantile(values, upper_q)) else {
        return;
    };
    for v in values.iter_mut().flatten() {
        *v = v.clamp(lower, upper);
    }
}

fn scaled_column<F>(rows: &[ProcessedRow], f: F) -> Vec<Option<f64>>
where
    F: Fn(&ProcessedRow) -> Option<f64>,
{
    min_max_scale(&rows.iter().map(f).collect::<Vec<_>>())
}

/// Builds the feature table for a processed batch, preserving row order.
pub fn build_features(rows: &[ProcessedRow]) -> Vec<FeatureRow> {
    let co = scaled_column(rows, |r| r.co);
    let mut no_log = scaled_column(rows, |r| log1p(r.no));
    let no2 = scaled_column(rows, |r| r.no2);
    let o3 = scaled_column(rows, |r| r.o3);
    let mut so2_log = scaled_column(rows, |r| log1p(r.so2));
    let nh3_log = scaled_column(rows, |r| log1p(r.nh3));
    let hour = scaled_column(rows, |r| Some(r.hour as f64));
    let day = scaled_column(rows, |r| Some(r.day as f64));

    winsorize(&mut no_log, LOWER_QUANTILE, UPPER_QUANTILE);
    winsorize(&mut so2_log, LOWER_QUANTILE, UPPER_QUANTILE);

    rows.iter()
        .enumerate()
        .map(|(i, row)| FeatureRow {
            timestamp: row.timestamp,
            month: row.month,
            calculated_aqi: row.calculated_aqi,
            aqi_change_rate: row.aqi_change_rate,
            co_scaled: co[i],
            no_log_scaled: no_log[i],
            no2_scaled: no2[i],
            o3_scaled: o3[i],
            so2_log_scaled: so2_log[i],
            nh3_log_scaled: nh3_log[i],
            hour_scaled: hour[i],
            day_scaled: day[i],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationRow;
    use crate::pollutant::Pollutant;
    use chrono::TimeZone;

    #[test]
    fn test_log1p() {
        assert_eq!(log1p(Some(0.0)), Some(0.0));
        assert_eq!(log1p(None), None);
        assert_eq!(log1p(Some(-1.0)), None);
        assert!((log1p(Some(std::f64::consts::E - 1.0)).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_scale() {
        let scaled = min_max_scale(&[Some(2.0), None, Some(6.0), Some(4.0)]);
        assert_eq!(scaled, vec![Some(0.0), None, Some(1.0), Some(0.5)]);
    }

    #[test]
    fn test_min_max_scale_constant_and_empty() {
        assert_eq!(min_max_scale(&[Some(3.0), Some(3.0)]), vec![Some(0.0), Some(0.0)]);
        assert_eq!(min_max_scale(&[None, None]), vec![None, None]);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values: Vec<_> = (0..=10).map(|v| Some(v as f64)).collect();
        assert_eq!(quantile(&values, 0.5), Some(5.0));
        assert_eq!(quantile(&values, 0.25), Some(2.5));
        assert_eq!(quantile(&values, 0.0), Some(0.0));
        assert_eq!(quantile(&values, 1.0), Some(10.0));
        assert_eq!(quantile(&[None], 0.5), None);
    }

    #[test]
    fn test_winsorize_clips_outliers() {
        let mut values: Vec<_> = (0..100).map(|v| Some(v as f64)).collect();
        values.push(Some(10_000.0));
        values.push(None);
        winsorize(&mut values, 0.01, 0.99);

        let upper = values[100].unwrap();
        assert!(upper < 10_000.0);
        assert_eq!(values[0], Some(1.0));
        assert_eq!(values[101], None);
    }

    #[test]
    fn test_build_features() {
        let rows: Vec<_> = (0..3)
            .map(|h| {
                let row = ObservationRow::new(Utc.with_ymd_and_hms(2025, 6, 10, h * 2, 0, 0).unwrap())
                    .with(Pollutant::Co, Some(100.0 * (h + 1) as f64))
                    .with(Pollutant::No, Some(0.0));
                ProcessedRow::from_observation(&row, None, None)
            })
            .collect();

        let features = build_features(&rows);
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].co_scaled, Some(0.0));
        assert_eq!(features[1].co_scaled, Some(0.5));
        assert_eq!(features[2].co_scaled, Some(1.0));
        assert_eq!(features[2].hour_scaled, Some(1.0));
        assert_eq!(features[0].day_scaled, Some(0.0));
        assert_eq!(features[0].no_log_scaled, Some(0.0));
        assert_eq!(features[0].so2_log_scaled, None);
        assert_eq!(features[1].month, 6);
    }
}
