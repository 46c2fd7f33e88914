//! Composite AQI computation.
//!
//! Each pollutant with a breakpoint table is mapped to a sub-index by
//! piecewise-linear interpolation. The row's AQI is the worst (largest)
//! sub-index, rounded to two decimals.

use serde::Serialize;

use crate::breakpoints::{Breakpoint, BreakpointTables};
use crate::observation::ObservationRow;
use crate::pollutant::Pollutant;

/// A single pollutant's contribution to a row's AQI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubIndex {
    pub pollutant: Pollutant,
    pub value: f64,
}

/// Interpolates `concentration` within the first breakpoint that contains it.
///
/// Returns `None` when no interval contains the value (negative, above the
/// last `high`, inside a hole between intervals, or NaN). Nothing is
/// extrapolated.
pub fn calculate_aqi(concentration: f64, breakpoints: &[Breakpoint]) -> Option<f64> {
    let bp = breakpoints.iter().find(|bp| bp.contains(concentration))?;

    if bp.high == bp.low {
        return Some(bp.aqi_high);
    }

    // Going through the fraction keeps both interval ends exact.
    let fraction = (concentration - bp.low) / (bp.high - bp.low);
    Some(bp.aqi_low + fraction * (bp.aqi_high - bp.aqi_low))
}

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Holds the breakpoint tables and reduces observation rows to an AQI.
#[derive(Debug, Clone, Default)]
pub struct AqiEngine {
    tables: BreakpointTables,
}

impl AqiEngine {
    pub fn new(tables: BreakpointTables) -> Self {
        Self { tables }
    }

    /// Engine over the reference EPA tables.
    pub fn epa() -> Self {
        Self::new(BreakpointTables::epa())
    }

    pub fn tables(&self) -> &BreakpointTables {
        &self.tables
    }

    /// Every defined sub-index in table order. Pollutants without a table
    /// or without a usable value are skipped.
    pub fn sub_indices(&self, row: &ObservationRow) -> Vec<SubIndex> {
        self.tables
            .iter()
            .filter_map(|table| {
                let concentration = row.get(table.pollutant)?;
                let value = calculate_aqi(concentration, &table.breakpoints)?;
                Some(SubIndex {
                    pollutant: table.pollutant,
                    value,
                })
            })
            .collect()
    }

    /// The largest unrounded sub-index. On a tie the pollutant seen first wins.
    pub fn dominant_sub_index(&self, row: &ObservationRow) -> Option<SubIndex> {
        self.sub_indices(row)
            .into_iter()
            .fold(None, |max: Option<SubIndex>, sub| match max {
                Some(m) if m.value >= sub.value => Some(m),
                _ => Some(sub),
            })
    }

    /// The composite AQI for a row, or `None` when no pollutant yields a sub-index.
    pub fn calculate_row_aqi(&self, row: &ObservationRow) -> Option<f64> {
        self.dominant_sub_index(row).map(|sub| round2(sub.value))
    }
}
