//! Speed estimation from raw position fixes.
//!
//! The sampler prefers the speed reported by the device and falls back to
//! deriving it from the great-circle distance between consecutive fixes.
//! Implausible values are dropped as GPS noise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::haversine_distance_m;
use crate::units::SpeedUnit;

/// Estimates at or above this value (in the preferred unit) are GPS noise.
pub const MAX_PLAUSIBLE_SPEED: f64 = 200.0;

/// A raw position fix from the location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// Device-reported speed in meters per second. Negative means unknown.
    #[serde(default)]
    pub reported_speed: Option<f64>,
    /// Horizontal accuracy in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl SpeedSample {
    /// A fix with position only.
    pub fn new(timestamp: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        Self {
            timestamp,
            lat,
            lon,
            reported_speed: None,
            accuracy: None,
        }
    }

    /// Attach a device-reported speed (m/s).
    pub fn with_reported_speed(mut self, mps: f64) -> Self {
        self.reported_speed = Some(mps);
        self
    }
}

/// How an estimate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    /// Taken from the device-reported speed.
    Reported,
    /// Derived from distance over time since the previous fix.
    Derived,
}

/// A speed estimate in the preferred unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEstimate {
    pub value: f64,
    pub unit: SpeedUnit,
    pub source: EstimateSource,
}

/// Converts position fixes into speed estimates.
#[derive(Debug)]
pub struct SpeedSampler {
    unit: SpeedUnit,
    /// Previous fix, replaced on every sample.
    prev: Option<SpeedSample>,
    /// Number of estimates dropped as noise.
    rejected: u64,
}

impl SpeedSampler {
    /// Create a sampler producing estimates in `unit`.
    pub fn new(unit: SpeedUnit) -> Self {
        Self {
            unit,
            prev: None,
            rejected: 0,
        }
    }

    /// Unit estimates are produced in.
    pub fn unit(&self) -> SpeedUnit {
        self.unit
    }

    /// Number of estimates dropped as implausible.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Previous fix, if any.
    pub fn previous(&self) -> Option<&SpeedSample> {
        self.prev.as_ref()
    }

    /// Process a fix, returning a new estimate if one can be made.
    ///
    /// The fix always becomes the previous fix, whether or not an estimate
    /// is emitted.
    pub fn on_sample(&mut self, fix: &SpeedSample) -> Option<SpeedEstimate> {
        let estimate = self.estimate(fix);
        self.prev = Some(fix.clone());

        let estimate = estimate?;
        if !estimate.value.is_finite() || estimate.value >= MAX_PLAUSIBLE_SPEED {
            self.rejected += 1;
            tracing::debug!(
                value = estimate.value,
                unit = %self.unit,
                "Speed estimate rejected as noise"
            );
            return None;
        }
        Some(estimate)
    }

    fn estimate(&self, fix: &SpeedSample) -> Option<SpeedEstimate> {
        if let Some(mps) = fix.reported_speed.filter(|s| *s >= 0.0) {
            return Some(SpeedEstimate {
                value: self.unit.from_mps(mps),
                unit: self.unit,
                source: EstimateSource::Reported,
            });
        }

        let prev = self.prev.as_ref()?;
        let elapsed_ms = (fix.timestamp - prev.timestamp).num_milliseconds();
        if elapsed_ms <= 0 {
            return None;
        }

        let meters = haversine_distance_m(prev.lat, prev.lon, fix.lat, fix.lon);
        let mps = meters / (elapsed_ms as f64 / 1000.0);
        Some(SpeedEstimate {
            value: self.unit.from_mps(mps),
            unit: self.unit,
            source: EstimateSource::Derived,
        })
    }
}
