//! Speed units and conversions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kilometres per mile (exact, international mile).
pub const KMH_PER_MPH: f64 = 1.609_344;

/// Meters-per-second to miles-per-hour.
pub const MPS_TO_MPH: f64 = 3600.0 / 1609.344;

/// Meters-per-second to kilometres-per-hour.
pub const MPS_TO_KMH: f64 = 3.6;

/// Unit a speed or speed limit is expressed in.
///
/// Serializes as `mph` or `km/h`. Deserializes through [`FromStr`], so wire
/// values are as lenient as parsed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum SpeedUnit {
    #[default]
    #[serde(rename = "mph")]
    Mph,
    #[serde(rename = "km/h")]
    Kmh,
}

impl SpeedUnit {
    /// Converts a speed in meters per second into this unit.
    #[inline]
    pub fn from_mps(self, mps: f64) -> f64 {
        match self {
            SpeedUnit::Mph => mps * MPS_TO_MPH,
            SpeedUnit::Kmh => mps * MPS_TO_KMH,
        }
    }

    /// Converts a value expressed in `from` into this unit.
    #[inline]
    pub fn convert_from(self, value: f64, from: SpeedUnit) -> f64 {
        match (from, self) {
            (SpeedUnit::Mph, SpeedUnit::Kmh) => value * KMH_PER_MPH,
            (SpeedUnit::Kmh, SpeedUnit::Mph) => value / KMH_PER_MPH,
            _ => value,
        }
    }

    /// Converts a posted limit into this unit, rounded to the nearest integer.
    pub fn convert_limit(self, limit: u32, from: SpeedUnit) -> u32 {
        if from == self {
            return limit;
        }
        self.convert_from(f64::from(limit), from).round() as u32
    }

    /// Short label used in logs and the CLI.
    pub fn label(&self) -> &'static str {
        match self {
            SpeedUnit::Mph => "mph",
            SpeedUnit::Kmh => "km/h",
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a unit string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown speed unit: {0:?}")]
pub struct UnknownUnit(pub String);

impl FromStr for SpeedUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mph" => Ok(SpeedUnit::Mph),
            "km/h" | "kmh" | "kph" => Ok(SpeedUnit::Kmh),
            _ => Err(UnknownUnit(s.to_string())),
        }
    }
}

impl TryFrom<String> for SpeedUnit {
    type Error = UnknownUnit;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
