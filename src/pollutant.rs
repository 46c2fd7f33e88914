//! Pollutant identifiers as reported by the reading source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// A pollutant column in an observation row.
///
/// Only some pollutants carry a breakpoint table; `No` and `Nh3` are
/// ingested and used as features but never contribute to the AQI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    Co,
    No,
    No2,
    O3,
    So2,
    #[serde(rename = "pm2_5")]
    Pm2_5,
    Pm10,
    Nh3,
}

impl Pollutant {
    pub const ALL: [Pollutant; 8] = [
        Pollutant::Co,
        Pollutant::No,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::So2,
        Pollutant::Pm2_5,
        Pollutant::Pm10,
        Pollutant::Nh3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::No => "no",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::So2 => "so2",
            Pollutant::Pm2_5 => "pm2_5",
            Pollutant::Pm10 => "pm10",
            Pollutant::Nh3 => "nh3",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pollutant {
    type Err = EngineError;

    /// Column names are matched after trimming and lowercasing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Pollutant::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or(EngineError::UnknownPollutant(name))
    }
}
