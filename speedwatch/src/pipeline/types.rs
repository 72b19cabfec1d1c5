//! Pipeline inputs, outputs and settings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::{AlertConfig, AlertUpdate};
use crate::resolver::LimitResolution;
use crate::sampler::SpeedSample;
use crate::threshold::ThresholdMode;
use crate::units::SpeedUnit;

/// Driver-facing settings the pipeline applies.
#[derive(Debug, Clone, Default)]
pub struct DriverSettings {
    pub preferred_unit: SpeedUnit,
    pub threshold_mode: ThresholdMode,
    pub alert: AlertConfig,
}

/// Events fed into the pipeline.
#[derive(Debug, Clone)]
pub enum PipelineInput {
    /// A position fix.
    Fix(SpeedSample),
    /// The location source cannot deliver positions.
    PositionUnavailable { reason: String, at: DateTime<Utc> },
    /// User mute toggle.
    SetMuted(bool),
}

/// Whether positions are currently available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PositionStatus {
    Available,
    Unavailable(String),
}

/// What subscribers see after each input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineUpdate {
    pub timestamp: DateTime<Utc>,
    pub position: PositionStatus,
    /// Last accepted speed estimate.
    pub speed: Option<f64>,
    pub unit: SpeedUnit,
    /// Most recent limit resolution.
    pub resolution: Option<LimitResolution>,
    /// Speed above which the driver counts as speeding.
    pub alert_speed: Option<f64>,
    pub alert: AlertUpdate,
}
