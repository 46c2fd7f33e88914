use serde::Serialize;
use std::fmt;

/// EPA health category for a composite AQI value.
///
/// | AQI        | Category                       |
/// |------------|--------------------------------|
/// | <= 50      | Good                           |
/// | <= 100     | Moderate                       |
/// | <= 150     | Unhealthy for Sensitive Groups |
/// | <= 200     | Unhealthy                      |
/// | <= 300     | Very Unhealthy                 |
/// | > 300      | Hazardous                      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn from_aqi(aqi: f64) -> Self {
        match aqi {
            a if a <= 50.0 => AqiCategory::Good,
            a if a <= 100.0 => AqiCategory::Moderate,
            a if a <= 150.0 => AqiCategory::UnhealthyForSensitiveGroups,
            a if a <= 200.0 => AqiCategory::Unhealthy,
            a if a <= 300.0 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
