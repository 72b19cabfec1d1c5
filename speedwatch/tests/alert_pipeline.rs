//! End-to-end: fixes in, alert updates out.

mod common;

use std::time::Duration;

use common::*;
use speedwatch::alert::{AlertConfig, AlertState};
use speedwatch::pipeline::{input_channel, DriverSettings, PipelineInput, PositionStatus};
use speedwatch::resolver::ResolutionOrigin;
use speedwatch::sampler::SpeedSample;
use speedwatch::threshold::{ThresholdMode, ZoneTable};
use speedwatch::units::{SpeedUnit, MPS_TO_MPH};
use tokio_util::sync::CancellationToken;

const LAT: f64 = 42.3601;
const LON: f64 = -71.0589;

fn settings(mode: ThresholdMode) -> DriverSettings {
    DriverSettings {
        preferred_unit: SpeedUnit::Mph,
        threshold_mode: mode,
        alert: AlertConfig {
            alert_delay: Duration::ZERO,
            ..AlertConfig::default()
        },
    }
}

fn fix_mph(secs: f64, mph: f64) -> PipelineInput {
    // Roughly 25 m per second of driving north
    let lat = LAT + secs * 0.000_225;
    PipelineInput::Fix(SpeedSample::new(at_secs(secs), lat, LON).with_reported_speed(mph / MPS_TO_MPH))
}

#[tokio::test]
async fn speeding_past_limit_plus_offset_alerts_once() {
    let client = ScriptedClient::answering(&limit_body(55, "mph"));
    let app = memory_app(
        client.clone(),
        default_config().with_settings(settings(ThresholdMode::Fixed(5.0))),
    );
    let mut pipeline = app.pipeline();

    let mut states = Vec::new();
    let mut announcements = Vec::new();
    let mut severities = Vec::new();
    for (i, mph) in [50.0, 62.0, 65.0].into_iter().enumerate() {
        let update = pipeline.handle(fix_mph(i as f64, mph)).await.unwrap();
        assert_eq!(update.alert_speed, Some(60.0));
        states.push(update.alert.state);
        announcements.push(update.alert.announce);
        severities.push(update.alert.severity);
    }

    assert_eq!(
        states,
        vec![AlertState::Safe, AlertState::Alerting, AlertState::Alerting]
    );
    assert_eq!(announcements, vec![false, true, false]);

    // (speed - 60) / 15: 0, then 2/15, then 5/15
    assert_eq!(severities[0], 0.0);
    assert!(severities[2] > severities[1]);
    assert!((severities[2] - 5.0 / 15.0).abs() < 1e-6);

    // Later fixes fall inside the throttle window and reuse the first answer
    assert_eq!(client.calls(), 1);
    let stats = app.metrics().snapshot();
    assert_eq!(stats.lookups, 3);
    assert_eq!(stats.throttled, 2);
}

#[tokio::test]
async fn dynamic_zones_pick_offset_by_limit() {
    let client = ScriptedClient::answering(&limit_body(55, "mph"));
    let app = memory_app(
        client,
        default_config().with_settings(settings(ThresholdMode::Dynamic(ZoneTable::default()))),
    );
    let mut pipeline = app.pipeline();

    // 55 mph falls in the 50-70 zone, offset 7
    let update = pipeline.handle(fix_mph(0.0, 61.0)).await.unwrap();
    assert_eq!(update.alert_speed, Some(62.0));
    assert_eq!(update.alert.state, AlertState::Safe);

    let update = pipeline.handle(fix_mph(1.0, 63.0)).await.unwrap();
    assert_eq!(update.alert.state, AlertState::Alerting);
}

#[tokio::test]
async fn limits_convert_to_preferred_unit() {
    let client = ScriptedClient::answering(&limit_body(100, "km/h"));
    let app = memory_app(
        client,
        default_config().with_settings(settings(ThresholdMode::Fixed(5.0))),
    );
    let mut pipeline = app.pipeline();

    let update = pipeline.handle(fix_mph(0.0, 40.0)).await.unwrap();
    let resolution = update.resolution.unwrap();
    assert_eq!(resolution.limit, Some(62));
    assert_eq!(resolution.unit, SpeedUnit::Mph);
    assert_eq!(resolution.origin, ResolutionOrigin::Network);
    assert_eq!(resolution.road_name.as_deref(), Some("Route 9"));
}

#[tokio::test]
async fn run_publishes_updates_and_returns_trip_summary() {
    let client = ScriptedClient::answering(&limit_body(55, "mph"));
    let app = memory_app(
        client,
        default_config().with_settings(settings(ThresholdMode::Fixed(5.0))),
    );
    let pipeline = app.pipeline();
    let mut updates = pipeline.subscribe();
    let (tx, rx) = input_channel();
    let handle = tokio::spawn(pipeline.run(rx, CancellationToken::new()));

    tx.send(fix_mph(0.0, 50.0)).await.unwrap();
    tx.send(fix_mph(1.0, 65.0)).await.unwrap();
    tx.send(PipelineInput::PositionUnavailable {
        reason: "permission denied".to_string(),
        at: at_secs(2.0),
    })
    .await
    .unwrap();
    tx.send(fix_mph(3.0, 50.0)).await.unwrap();
    drop(tx);

    let summary = handle.await.unwrap();

    let mut seen = Vec::new();
    while let Ok(update) = updates.try_recv() {
        seen.push(update);
    }
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[1].alert.state, AlertState::Alerting);
    assert_eq!(
        seen[2].position,
        PositionStatus::Unavailable("permission denied".to_string())
    );
    assert_eq!(seen[3].position, PositionStatus::Available);
    assert_eq!(seen[3].alert.state, AlertState::Safe);

    assert_eq!(summary.samples, 3);
    assert_eq!(summary.alert_episodes, 1);
    assert!((summary.max_speed - 65.0).abs() < 1e-6);
    assert!(summary.distance_m > 0.0);
}
