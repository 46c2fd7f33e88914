//! Batch derivation: dedupe, compute the AQI per row, order by time, diff.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::change_rate::change_rates;
use crate::engine::{AqiEngine, round2};
use crate::observation::{ObservationRow, ProcessedRow};

/// Drops rows whose readings repeat an earlier row, ignoring timestamps.
/// The first occurrence is kept.
pub fn dedupe(rows: Vec<ObservationRow>) -> Vec<ObservationRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.reading_key()))
        .collect()
}

/// Derives `calculated_aqi` and `aqi_change_rate` for a batch.
///
/// The output is sorted ascending by timestamp (stable, so equal timestamps
/// keep their input order) and the change rate is taken over that order.
#[tracing::instrument(skip_all, fields(rows = rows.len()))]
pub fn process_batch(engine: &AqiEngine, rows: Vec<ObservationRow>) -> Vec<ProcessedRow> {
    let input = rows.len();
    let mut rows = dedupe(rows);
    if rows.len() < input {
        debug!(dropped = input - rows.len(), "Dropped duplicate readings");
    }

    rows.sort_by_key(|row| row.timestamp);

    let mut processed: Vec<ProcessedRow> = rows
        .iter()
        .map(|row| {
            let dominant = engine.dominant_sub_index(row);
            ProcessedRow::from_observation(
                row,
                dominant.map(|sub| sub.pollutant),
                dominant.map(|sub| round2(sub.value)),
            )
        })
        .collect();

    let aqi: Vec<Option<f64>> = processed.iter().map(|row| row.calculated_aqi).collect();
    for (row, rate) in processed.iter_mut().zip(change_rates(&aqi)) {
        row.aqi_change_rate = rate;
    }

    let undefined = aqi.iter().filter(|v| v.is_none()).count();
    info!(rows = processed.len(), undefined, "Computed AQI for batch");

    processed
}
