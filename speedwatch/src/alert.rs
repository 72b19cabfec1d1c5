//! Speeding alert state machine.
//!
//! Driven once per sample tick with the current speed, the alert threshold
//! and the tick time. The caller supplies `now`; nothing here reads the
//! clock, so every transition is reproducible in tests.
//!
//! # State Machine
//!
//! ```text
//! Safe --[speed > threshold]--> Pending (since = now)
//! Pending --[still over, now - since >= delay]--> Alerting
//! Pending/Alerting --[speed <= threshold or no threshold]--> Safe
//! ```
//!
//! `Muted` is an override on top of this classification: while muted, an
//! Alerting classification is reported as `Muted` and nothing is announced.
//!
//! Severity is derived from how far over the threshold the speed is and
//! never affects transitions.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default delay before a sustained overspeed becomes an alert.
pub const DEFAULT_ALERT_DELAY: Duration = Duration::from_secs(3);

/// Minimum time between announcements while continuously alerting.
pub const DEFAULT_REANNOUNCE_INTERVAL: Duration = Duration::from_secs(10);

/// Overspeed at which severity saturates at 1.0.
pub const DEFAULT_MAX_OVER: f64 = 15.0;

/// Alert state as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Safe,
    Pending,
    Alerting,
    Muted,
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertState::Safe => "safe",
            AlertState::Pending => "pending",
            AlertState::Alerting => "alerting",
            AlertState::Muted => "muted",
        })
    }
}

/// Alert timing configuration.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Time over threshold before Pending becomes Alerting; zero is immediate.
    pub alert_delay: Duration,
    /// Minimum gap between announcements while Alerting.
    pub reannounce_interval: Duration,
    /// Overspeed at which severity reaches 1.0.
    pub max_over: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            alert_delay: DEFAULT_ALERT_DELAY,
            reannounce_interval: DEFAULT_REANNOUNCE_INTERVAL,
            max_over: DEFAULT_MAX_OVER,
        }
    }
}

/// Result of one tick, published to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertUpdate {
    /// Reported state, with the mute override applied.
    pub state: AlertState,
    /// Underlying classification (never `Muted`).
    pub classification: AlertState,
    /// Overspeed intensity in `0.0..=1.0`.
    pub severity: f64,
    /// True if the notifier should (re-)announce on this tick.
    pub announce: bool,
}

/// Severity for a speed relative to the threshold.
///
/// Zero at or below the threshold, rising linearly to 1.0 at `max_over`
/// above it and saturating there.
pub fn severity(speed: f64, threshold: f64, max_over: f64) -> f64 {
    let over = speed - threshold;
    if over.is_nan() || over <= 0.0 {
        return 0.0;
    }
    if max_over <= 0.0 {
        return 1.0;
    }
    (over / max_over).clamp(0.0, 1.0)
}

/// Hysteretic speeding alert state machine.
#[derive(Debug)]
pub struct AlertStateMachine {
    config: AlertConfig,
    /// Safe, Pending or Alerting.
    classification: AlertState,
    /// When the current overspeed episode started.
    since: Option<DateTime<Utc>>,
    last_announced: Option<DateTime<Utc>>,
    muted: bool,
    /// Severity from the last tick.
    severity: f64,
}

impl Default for AlertStateMachine {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

impl AlertStateMachine {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            classification: AlertState::Safe,
            since: None,
            last_announced: None,
            muted: false,
            severity: 0.0,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Reported state, with the mute override applied.
    pub fn state(&self) -> AlertState {
        if self.muted && self.classification == AlertState::Alerting {
            AlertState::Muted
        } else {
            self.classification
        }
    }

    /// Underlying Safe/Pending/Alerting classification.
    pub fn classification(&self) -> AlertState {
        self.classification
    }

    /// Start of the current overspeed episode.
    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn last_announced(&self) -> Option<DateTime<Utc>> {
        self.last_announced
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Suppress announcements; the classification keeps updating.
    pub fn mute(&mut self) {
        if !self.muted {
            tracing::info!("Alerts muted");
        }
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        if self.muted {
            tracing::info!("Alerts unmuted");
        }
        self.muted = false;
    }

    /// The state after the last tick, without announcing.
    pub fn current(&self) -> AlertUpdate {
        self.update(self.severity, false)
    }

    /// Advance the machine by one sample.
    ///
    /// `threshold` is `None` when no limit is known, which counts as not
    /// speeding.
    pub fn tick(&mut self, speed: f64, threshold: Option<f64>, now: DateTime<Utc>) -> AlertUpdate {
        let over = threshold.map_or(false, |t| speed > t);
        let previous = self.classification;

        if !over {
            if previous != AlertState::Safe {
                tracing::info!(from = %previous, speed, ?threshold, "Alert cleared");
            }
            self.classification = AlertState::Safe;
            self.since = None;
            self.last_announced = None;
            self.severity = 0.0;
            return self.update(0.0, false);
        }

        if previous == AlertState::Safe {
            self.classification = AlertState::Pending;
            self.since = Some(now);
            tracing::debug!(speed, ?threshold, "Overspeed, alert pending");
        }

        let mut announce = false;
        if self.classification == AlertState::Pending {
            let since = self.since.unwrap_or(now);
            if elapsed(since, now) >= self.config.alert_delay {
                self.classification = AlertState::Alerting;
                tracing::info!(
                    speed,
                    ?threshold,
                    held_ms = elapsed(since, now).as_millis() as u64,
                    "Alerting"
                );
                announce = !self.muted;
            }
        } else if self.classification == AlertState::Alerting && !self.muted {
            announce = self
                .last_announced
                .map_or(true, |last| elapsed(last, now) >= self.config.reannounce_interval);
        }

        if announce {
            self.last_announced = Some(now);
        }

        self.severity = threshold.map_or(0.0, |t| severity(speed, t, self.config.max_over));
        self.update(self.severity, announce)
    }

    fn update(&self, severity: f64, announce: bool) -> AlertUpdate {
        AlertUpdate {
            state: self.state(),
            classification: self.classification,
            severity,
            announce,
        }
    }
}

/// Non-negative time from `from` to `to`.
fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}
