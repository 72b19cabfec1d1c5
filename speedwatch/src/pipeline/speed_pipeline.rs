//! The speed pipeline runner.

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::types::{DriverSettings, PipelineInput, PipelineUpdate, PositionStatus};
use crate::alert::AlertStateMachine;
use crate::resolver::{LimitResolution, LimitResolver};
use crate::sampler::{SpeedSample, SpeedSampler};
use crate::threshold::ThresholdMode;
use crate::trip::{TripSummary, TripTracker};
use crate::units::SpeedUnit;

/// Default capacity of the input channel.
pub const DEFAULT_INPUT_CAPACITY: usize = 64;

/// Default capacity of the update broadcast channel.
pub const DEFAULT_UPDATE_CAPACITY: usize = 64;

/// Create the channel that feeds a pipeline.
pub fn input_channel() -> (mpsc::Sender<PipelineInput>, mpsc::Receiver<PipelineInput>) {
    mpsc::channel(DEFAULT_INPUT_CAPACITY)
}

/// Turns position fixes into alert updates.
///
/// Owns every stateful stage. Use [`SpeedPipeline::run`] to drive it from a
/// channel, or call [`SpeedPipeline::handle`] directly.
pub struct SpeedPipeline {
    unit: SpeedUnit,
    sampler: SpeedSampler,
    resolver: LimitResolver,
    threshold_mode: ThresholdMode,
    alerts: AlertStateMachine,
    trip: TripTracker,
    updates: broadcast::Sender<PipelineUpdate>,
    /// Last accepted speed; rejected estimates leave it unchanged.
    last_speed: Option<f64>,
    /// Last resolution; throttled lookups leave it unchanged.
    last_resolution: Option<LimitResolution>,
    position: PositionStatus,
}

impl std::fmt::Debug for SpeedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedPipeline")
            .field("unit", &self.unit)
            .field("last_speed", &self.last_speed)
            .field("last_resolution", &self.last_resolution)
            .field("alert_state", &self.alerts.state())
            .finish_non_exhaustive()
    }
}

impl SpeedPipeline {
    pub fn new(resolver: LimitResolver, settings: DriverSettings) -> Self {
        let (updates, _) = broadcast::channel(DEFAULT_UPDATE_CAPACITY);
        Self {
            unit: settings.preferred_unit,
            sampler: SpeedSampler::new(settings.preferred_unit),
            resolver,
            threshold_mode: settings.threshold_mode,
            alerts: AlertStateMachine::new(settings.alert),
            trip: TripTracker::new(settings.preferred_unit),
            updates,
            last_speed: None,
            last_resolution: None,
            position: PositionStatus::Available,
        }
    }

    /// Receive every update published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineUpdate> {
        self.updates.subscribe()
    }

    pub fn resolver(&self) -> &LimitResolver {
        &self.resolver
    }

    pub fn alerts(&self) -> &AlertStateMachine {
        &self.alerts
    }

    pub fn trip_summary(&self) -> TripSummary {
        self.trip.summary()
    }

    /// Process inputs until the channel closes or `shutdown` fires.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<PipelineInput>,
        shutdown: CancellationToken,
    ) -> TripSummary {
        tracing::info!(unit = %self.unit, mode = self.threshold_mode.name(), "Speed pipeline started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::debug!("Speed pipeline cancelled");
                    break;
                }

                input = inputs.recv() => {
                    match input {
                        Some(input) => {
                            self.handle(input).await;
                        }
                        None => {
                            tracing::debug!("Speed pipeline input closed");
                            break;
                        }
                    }
                }
            }
        }

        let summary = self.trip.summary();
        tracing::info!(
            samples = summary.samples,
            distance_m = summary.distance_m as u64,
            alert_episodes = summary.alert_episodes,
            "Speed pipeline stopped"
        );
        summary
    }

    /// Process one input and publish the resulting update.
    ///
    /// Returns `None` for inputs that do not produce an update.
    pub async fn handle(&mut self, input: PipelineInput) -> Option<PipelineUpdate> {
        let update = match input {
            PipelineInput::Fix(fix) => self.on_fix(fix).await,
            PipelineInput::PositionUnavailable { reason, at } => self.on_unavailable(reason, at),
            PipelineInput::SetMuted(muted) => {
                if muted {
                    self.alerts.mute();
                } else {
                    self.alerts.unmute();
                }
                return None;
            }
        };

        // No subscribers is fine
        let _ = self.updates.send(update.clone());
        Some(update)
    }

    async fn on_fix(&mut self, fix: SpeedSample) -> PipelineUpdate {
        let now = fix.timestamp;
        if self.position != PositionStatus::Available {
            tracing::info!("Position available again");
            self.position = PositionStatus::Available;
        }

        let rejected_before = self.sampler.rejected();
        let estimate = self.sampler.on_sample(&fix);
        let noise = self.sampler.rejected() > rejected_before;
        self.trip.record_fix(&fix, noise);
        if let Some(estimate) = estimate {
            self.last_speed = Some(estimate.value);
            self.trip.record_speed(estimate.value);
        }

        if let Some(resolution) = self
            .resolver
            .resolve_at(fix.lat, fix.lon, self.unit, now)
            .await
        {
            self.last_resolution = Some(resolution);
        }

        let alert_speed = self.alert_speed();
        let alert = self
            .alerts
            .tick(self.last_speed.unwrap_or(0.0), alert_speed, now);
        self.trip.record_alert(&alert);

        tracing::debug!(
            speed = ?self.last_speed,
            limit = ?self.last_resolution.as_ref().and_then(|r| r.limit),
            ?alert_speed,
            state = %alert.state,
            severity = alert.severity,
            "Fix processed"
        );

        self.snapshot(now, alert_speed, alert)
    }

    fn on_unavailable(&mut self, reason: String, at: DateTime<Utc>) -> PipelineUpdate {
        tracing::warn!(reason = %reason, "Cannot determine position");
        self.position = PositionStatus::Unavailable(reason);
        let alert = self.alerts.current();
        self.snapshot(at, self.alert_speed(), alert)
    }

    fn alert_speed(&self) -> Option<f64> {
        self.last_resolution
            .as_ref()
            .and_then(|r| r.limit)
            .map(|limit| self.threshold_mode.alert_speed(f64::from(limit)))
    }

    fn snapshot(
        &self,
        timestamp: DateTime<Utc>,
        alert_speed: Option<f64>,
        alert: crate::alert::AlertUpdate,
    ) -> PipelineUpdate {
        PipelineUpdate {
            timestamp,
            position: self.position.clone(),
            speed: self.last_speed,
            unit: self.unit,
            resolution: self.last_resolution.clone(),
            alert_speed,
            alert,
        }
    }
}
