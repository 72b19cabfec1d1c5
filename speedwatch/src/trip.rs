//! Local trip summary.
//!
//! Accumulated by the pipeline while it runs and reported when it stops.
//! Nothing here is persisted.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::{AlertState, AlertUpdate};
use crate::coord::haversine_distance_m;
use crate::sampler::SpeedSample;
use crate::units::SpeedUnit;

/// Totals for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub distance_m: f64,
    pub max_speed: f64,
    pub avg_speed: f64,
    pub unit: SpeedUnit,
    /// Times the alert classification entered Alerting.
    pub alert_episodes: u32,
    /// Fixes seen, including those that produced no estimate.
    pub samples: u64,
}

impl TripSummary {
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        }
    }
}

impl fmt::Display for TripSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.duration().as_secs();
        writeln!(f, "Duration:        {}m {:02}s", secs / 60, secs % 60)?;
        writeln!(f, "Distance:        {:.2} km", self.distance_m / 1000.0)?;
        writeln!(f, "Max speed:       {:.1} {}", self.max_speed, self.unit)?;
        writeln!(f, "Average speed:   {:.1} {}", self.avg_speed, self.unit)?;
        writeln!(f, "Alert episodes:  {}", self.alert_episodes)?;
        write!(f, "Samples:         {}", self.samples)
    }
}

/// Accumulates a [`TripSummary`] from pipeline events.
#[derive(Debug)]
pub struct TripTracker {
    unit: SpeedUnit,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    last_position: Option<(f64, f64)>,
    distance_m: f64,
    max_speed: f64,
    speed_sum: f64,
    speed_count: u64,
    alert_episodes: u32,
    samples: u64,
    last_classification: AlertState,
}

impl TripTracker {
    pub fn new(unit: SpeedUnit) -> Self {
        Self {
            unit,
            started_at: None,
            ended_at: None,
            last_position: None,
            distance_m: 0.0,
            max_speed: 0.0,
            speed_sum: 0.0,
            speed_count: 0,
            alert_episodes: 0,
            samples: 0,
            last_classification: AlertState::Safe,
        }
    }

    /// Record a raw fix.
    ///
    /// A fix whose speed estimate was rejected as noise still counts as a
    /// sample and becomes the new position, but the hop to it adds no
    /// distance.
    pub fn record_fix(&mut self, fix: &SpeedSample, noise: bool) {
        self.samples += 1;
        self.started_at.get_or_insert(fix.timestamp);
        self.ended_at = Some(fix.timestamp);

        if let Some((lat, lon)) = self.last_position {
            if !noise {
                self.distance_m += haversine_distance_m(lat, lon, fix.lat, fix.lon);
            }
        }
        self.last_position = Some((fix.lat, fix.lon));
    }

    /// Record an accepted speed estimate.
    pub fn record_speed(&mut self, speed: f64) {
        self.max_speed = self.max_speed.max(speed);
        self.speed_sum += speed;
        self.speed_count += 1;
    }

    /// Record an alert update; counts entries into Alerting.
    pub fn record_alert(&mut self, update: &AlertUpdate) {
        if update.classification == AlertState::Alerting
            && self.last_classification != AlertState::Alerting
        {
            self.alert_episodes += 1;
        }
        self.last_classification = update.classification;
    }

    pub fn summary(&self) -> TripSummary {
        TripSummary {
            started_at: self.started_at,
            ended_at: self.ended_at,
            distance_m: self.distance_m,
            max_speed: self.max_speed,
            avg_speed: if self.speed_count == 0 {
                0.0
            } else {
                self.speed_sum / self.speed_count as f64
            },
            unit: self.unit,
            alert_episodes: self.alert_episodes,
            samples: self.samples,
        }
    }
}
