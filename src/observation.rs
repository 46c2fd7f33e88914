//! Observation rows as ingested and as emitted after AQI derivation.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::pollutant::Pollutant;

/// One timestamped set of pollutant concentrations.
///
/// A pollutant that is absent and one that is present but null are treated
/// the same way by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub timestamp: DateTime<Utc>,
    /// Index reported by the reading source itself (1-5 for OpenWeather), if any.
    pub provider_index: Option<u8>,
    pub concentrations: BTreeMap<Pollutant, Option<f64>>,
}

impl ObservationRow {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            provider_index: None,
            concentrations: BTreeMap::new(),
        }
    }

    pub fn with(mut self, pollutant: Pollutant, value: Option<f64>) -> Self {
        self.concentrations.insert(pollutant, value);
        self
    }

    pub fn set(&mut self, pollutant: Pollutant, value: Option<f64>) {
        self.concentrations.insert(pollutant, value);
    }

    /// The concentration, or `None` when missing, null or NaN.
    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        self.concentrations
            .get(&pollutant)
            .copied()
            .flatten()
            .filter(|v| !v.is_nan())
    }

    /// Hashable identity of the readings, ignoring the timestamp.
    pub fn reading_key(&self) -> (Option<u8>, [Option<u64>; 8]) {
        (
            self.provider_index,
            Pollutant::ALL.map(|p| self.get(p).map(f64::to_bits)),
        )
    }
}

/// Flat CSV layout of an [`ObservationRow`], readable back by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReading {
    pub timestamp: DateTime<Utc>,
    pub aqi_index: Option<u8>,
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

impl From<&ObservationRow> for RawReading {
    fn from(row: &ObservationRow) -> Self {
        Self {
            timestamp: row.timestamp,
            aqi_index: row.provider_index,
            co: row.get(Pollutant::Co),
            no: row.get(Pollutant::No),
            no2: row.get(Pollutant::No2),
            o3: row.get(Pollutant::O3),
            so2: row.get(Pollutant::So2),
            pm2_5: row.get(Pollutant::Pm2_5),
            pm10: row.get(Pollutant::Pm10),
            nh3: row.get(Pollutant::Nh3),
        }
    }
}

/// An observation augmented with the derived AQI columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedRow {
    pub timestamp: DateTime<Utc>,
    pub hour: u32,
    pub day: u32,
    pub month: u32,
    pub aqi_index: Option<u8>,
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
    pub dominant_pollutant: Option<Pollutant>,
    pub calculated_aqi: Option<f64>,
    pub aqi_change_rate: Option<f64>,
}

impl ProcessedRow {
    /// Copies the readings and time parts; the change rate is filled in per batch.
    pub fn from_observation(
        row: &ObservationRow,
        dominant_pollutant: Option<Pollutant>,
        calculated_aqi: Option<f64>,
    ) -> Self {
        Self {
            timestamp: row.timestamp,
            hour: row.timestamp.hour(),
            day: row.timestamp.day(),
            month: row.timestamp.month(),
            aqi_index: row.provider_index,
            co: row.get(Pollutant::Co),
            no: row.get(Pollutant::No),
            no2: row.get(Pollutant::No2),
            o3: row.get(Pollutant::O3),
            so2: row.get(Pollutant::So2),
            pm2_5: row.get(Pollutant::Pm2_5),
            pm10: row.get(Pollutant::Pm10),
            nh3: row.get(Pollutant::Nh3),
            dominant_pollutant,
            calculated_aqi,
            aqi_change_rate: None,
        }
    }
}
