//! Breakpoint tables mapping pollutant concentrations onto AQI sub-ranges.
//!
//! The reference data follows the US EPA conventions. The `o3` table stops
//! at the 201-300 band; it is kept as-is and concentrations above its last
//! breakpoint have no sub-index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::pollutant::Pollutant;

/// Widest hole allowed between two consecutive intervals. The reference
/// tables leave holes of one reporting unit (e.g. 12.0 to 12.1).
pub const DEFAULT_MAX_GAP: f64 = 1.0;

/// One concentration interval `[low, high]` and the AQI range `[aqi_low, aqi_high]` it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub low: f64,
    pub high: f64,
    pub aqi_low: f64,
    pub aqi_high: f64,
}

impl Breakpoint {
    pub const fn new(low: f64, high: f64, aqi_low: f64, aqi_high: f64) -> Self {
        Self {
            low,
            high,
            aqi_low,
            aqi_high,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, concentration: f64) -> bool {
        self.low <= concentration && concentration <= self.high
    }
}

const PM2_5: &[Breakpoint] = &[
    Breakpoint::new(0.0, 12.0, 0.0, 50.0),
    Breakpoint::new(12.1, 35.4, 51.0, 100.0),
    Breakpoint::new(35.5, 55.4, 101.0, 150.0),
    Breakpoint::new(55.5, 150.4, 151.0, 200.0),
    Breakpoint::new(150.5, 250.4, 201.0, 300.0),
    Breakpoint::new(250.5, 350.4, 301.0, 400.0),
    Breakpoint::new(350.5, 500.4, 401.0, 500.0),
];

const PM10: &[Breakpoint] = &[
    Breakpoint::new(0.0, 54.0, 0.0, 50.0),
    Breakpoint::new(55.0, 154.0, 51.0, 100.0),
    Breakpoint::new(155.0, 254.0, 101.0, 150.0),
    Breakpoint::new(255.0, 354.0, 151.0, 200.0),
    Breakpoint::new(355.0, 424.0, 201.0, 300.0),
    Breakpoint::new(425.0, 504.0, 301.0, 400.0),
    Breakpoint::new(505.0, 604.0, 401.0, 500.0),
];

const CO: &[Breakpoint] = &[
    Breakpoint::new(0.0, 4.4, 0.0, 50.0),
    Breakpoint::new(4.5, 9.4, 51.0, 100.0),
    Breakpoint::new(9.5, 12.4, 101.0, 150.0),
    Breakpoint::new(12.5, 15.4, 151.0, 200.0),
    Breakpoint::new(15.5, 30.4, 201.0, 300.0),
    Breakpoint::new(30.5, 40.4, 301.0, 400.0),
    Breakpoint::new(40.5, 50.4, 401.0, 500.0),
];

const NO2: &[Breakpoint] = &[
    Breakpoint::new(0.0, 53.0, 0.0, 50.0),
    Breakpoint::new(54.0, 100.0, 51.0, 100.0),
    Breakpoint::new(101.0, 360.0, 101.0, 150.0),
    Breakpoint::new(361.0, 649.0, 151.0, 200.0),
    Breakpoint::new(650.0, 1249.0, 201.0, 300.0),
    Breakpoint::new(1250.0, 1649.0, 301.0, 400.0),
    Breakpoint::new(1650.0, 2049.0, 401.0, 500.0),
];

const SO2: &[Breakpoint] = &[
    Breakpoint::new(0.0, 35.0, 0.0, 50.0),
    Breakpoint::new(36.0, 75.0, 51.0, 100.0),
    Breakpoint::new(76.0, 185.0, 101.0, 150.0),
    Breakpoint::new(186.0, 304.0, 151.0, 200.0),
    Breakpoint::new(305.0, 604.0, 201.0, 300.0),
    Breakpoint::new(605.0, 804.0, 301.0, 400.0),
    Breakpoint::new(805.0, 1004.0, 401.0, 500.0),
];

const O3: &[Breakpoint] = &[
    Breakpoint::new(0.0, 54.0, 0.0, 50.0),
    Breakpoint::new(55.0, 70.0, 51.0, 100.0),
    Breakpoint::new(71.0, 85.0, 101.0, 150.0),
    Breakpoint::new(86.0, 105.0, 151.0, 200.0),
    Breakpoint::new(106.0, 200.0, 201.0, 300.0),
];

/// The ordered breakpoints for a single pollutant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakpointTable {
    pub pollutant: Pollutant,
    pub breakpoints: Vec<Breakpoint>,
}

impl BreakpointTable {
    pub fn new(pollutant: Pollutant, breakpoints: Vec<Breakpoint>) -> Self {
        Self {
            pollutant,
            breakpoints,
        }
    }

    /// Checks the table with [`DEFAULT_MAX_GAP`].
    pub fn validate(&self) -> Result<()> {
        self.validate_with_gap(DEFAULT_MAX_GAP)
    }

    /// Rejects empty tables, non-finite values, inverted intervals,
    /// overlapping or descending intervals, and holes wider than `max_gap`.
    pub fn validate_with_gap(&self, max_gap: f64) -> Result<()> {
        if self.breakpoints.is_empty() {
            return Err(EngineError::EmptyTable(self.pollutant));
        }

        let invalid = |index: usize, reason: String| EngineError::InvalidTable {
            pollutant: self.pollutant,
            index,
            reason,
        };

        for (index, bp) in self.breakpoints.iter().enumerate() {
            if ![bp.low, bp.high, bp.aqi_low, bp.aqi_high]
                .iter()
                .all(|v| v.is_finite())
            {
                return Err(invalid(index, "non-finite value".into()));
            }
            if bp.low > bp.high {
                return Err(invalid(
                    index,
                    format!("low {} above high {}", bp.low, bp.high),
                ));
            }
            if bp.aqi_low > bp.aqi_high {
                return Err(invalid(
                    index,
                    format!("aqi_low {} above aqi_high {}", bp.aqi_low, bp.aqi_high),
                ));
            }
        }

        for (index, pair) in self.breakpoints.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.low <= prev.high {
                return Err(invalid(
                    index + 1,
                    format!("low {} overlaps previous high {}", next.low, prev.high),
                ));
            }
            if next.low - prev.high > max_gap {
                return Err(invalid(
                    index + 1,
                    format!("gap of {} after previous high {}", next.low - prev.high, prev.high),
                ));
            }
        }

        Ok(())
    }

    /// Highest concentration any interval covers.
    pub fn max_concentration(&self) -> Option<f64> {
        self.breakpoints.last().map(|bp| bp.high)
    }
}

/// The full set of per-pollutant tables the engine reduces over.
///
/// Read-only once built; pollutants without a table never contribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakpointTables {
    tables: Vec<BreakpointTable>,
}

impl BreakpointTables {
    /// Validates every table and rejects a pollutant listed twice.
    pub fn new(tables: Vec<BreakpointTable>) -> Result<Self> {
        for (i, table) in tables.iter().enumerate() {
            table.validate()?;
            if tables[..i].iter().any(|t| t.pollutant == table.pollutant) {
                return Err(EngineError::DuplicateTable(table.pollutant));
            }
        }
        Ok(Self { tables })
    }

    /// The reference EPA tables.
    pub fn epa() -> Self {
        let tables = [
            (Pollutant::Pm2_5, PM2_5),
            (Pollutant::Pm10, PM10),
            (Pollutant::Co, CO),
            (Pollutant::No2, NO2),
            (Pollutant::So2, SO2),
            (Pollutant::O3, O3),
        ]
        .into_iter()
        .map(|(pollutant, bps)| BreakpointTable::new(pollutant, bps.to_vec()))
        .collect();

        Self { tables }
    }

    /// Parses a JSON object of `pollutant -> [{low, high, aqi_low, aqi_high}, ...]`.
    ///
    /// ```json
    /// { "co": [{ "low": 0.0, "high": 4.4, "aqi_low": 0, "aqi_high": 50 }] }
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<Breakpoint>> = serde_json::from_str(json)?;

        let mut tables = raw
            .into_iter()
            .map(|(name, bps)| Ok(BreakpointTable::new(name.parse()?, bps)))
            .collect::<Result<Vec<_>>>()?;
        tables.sort_by_key(|t| t.pollutant);

        Self::new(tables)
    }

    /// Reads and validates a JSON table file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read breakpoint file {}", path.display()))?;
        let tables = Self::from_json_str(&content)
            .with_context(|| format!("Invalid breakpoint file {}", path.display()))?;
        debug!(path = %path.display(), tables = tables.len(), "Loaded breakpoint tables");
        Ok(tables)
    }

    pub fn get(&self, pollutant: Pollutant) -> Option<&BreakpointTable> {
        self.tables.iter().find(|t| t.pollutant == pollutant)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BreakpointTable> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for BreakpointTables {
    fn default() -> Self {
        Self::epa()
    }
}
