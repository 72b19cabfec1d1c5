//! `replay`: feed recorded fixes through the full pipeline.
//!
//! The input is JSON lines. Each line is either a fix
//! (`{"timestamp": ..., "lat": ..., "lon": ..., "reported_speed": ...}`) or
//! a position outage (`{"timestamp": ..., "unavailable": "reason"}`).
//! Blank lines and lines starting with `#` are skipped.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use speedwatch::config::ConfigFile;
use speedwatch::pipeline::{input_channel, PipelineInput, PipelineUpdate};
use speedwatch::sampler::SpeedSample;
use speedwatch::units::SpeedUnit;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::common::start_app;
use crate::error::CliError;

#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub file: PathBuf,
    pub unit: Option<SpeedUnit>,
    pub offline: bool,
    pub muted: bool,
    pub json: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Unavailable {
        timestamp: DateTime<Utc>,
        unavailable: String,
    },
    Fix(SpeedSample),
}

/// Parse a replay file's contents into pipeline inputs.
pub fn parse_replay(contents: &str) -> Result<Vec<PipelineInput>, CliError> {
    let mut inputs = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed: ReplayLine =
            serde_json::from_str(line).map_err(|e| CliError::ReplayParse {
                line: index + 1,
                message: e.to_string(),
            })?;
        inputs.push(match parsed {
            ReplayLine::Unavailable {
                timestamp,
                unavailable,
            } => PipelineInput::PositionUnavailable {
                reason: unavailable,
                at: timestamp,
            },
            ReplayLine::Fix(fix) => PipelineInput::Fix(fix),
        });
    }
    Ok(inputs)
}

pub async fn run(config: &ConfigFile, args: ReplayArgs) -> Result<(), CliError> {
    let contents = std::fs::read_to_string(&args.file).map_err(|source| CliError::ReplayRead {
        path: args.file.clone(),
        source,
    })?;
    let inputs = parse_replay(&contents)?;
    tracing::info!(path = %args.file.display(), fixes = inputs.len(), "Replaying fixes");

    let app = start_app(config, args.unit)?;
    if args.offline {
        app.connectivity().set_online(false);
    }

    let pipeline = app.pipeline();
    let mut updates = pipeline.subscribe();
    let (tx, rx) = input_channel();
    let runner = tokio::spawn(pipeline.run(rx, CancellationToken::new()));

    let muted = args.muted;
    let feeder = tokio::spawn(async move {
        if muted && tx.send(PipelineInput::SetMuted(true)).await.is_err() {
            return;
        }
        for input in inputs {
            if tx.send(input).await.is_err() {
                break;
            }
        }
    });

    loop {
        match updates.recv().await {
            Ok(update) => print_update(&update, args.json)?,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Output fell behind, updates skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }

    let _ = feeder.await;
    let summary = runner
        .await
        .map_err(|e| CliError::Output(format!("pipeline task failed: {}", e)))?;

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!();
        println!("Trip summary");
        println!("============");
        println!("{}", summary);
        println!();
        println!("Resolver");
        println!("========");
        println!("{}", app.metrics().snapshot());
    }
    Ok(())
}

fn print_update(update: &PipelineUpdate, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string(update)?);
        return Ok(());
    }

    let speed = update
        .speed
        .map_or_else(|| "--".to_string(), |s| format!("{:.1}", s));
    let limit = update
        .resolution
        .as_ref()
        .map_or_else(|| "unknown".to_string(), |r| r.to_string());
    let marker = if update.alert.announce { "  <<< SLOW DOWN" } else { "" };

    println!(
        "{}  {:>6} {:<5} limit {:<28} {:<9} severity {:.2}{}",
        update.timestamp.format("%H:%M:%S"),
        speed,
        update.unit.to_string(),
        limit,
        update.alert.state.to_string(),
        update.alert.severity,
        marker
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay_mixed_lines() {
        let contents = r#"
# morning commute
{"timestamp":"2024-05-01T08:00:00Z","lat":40.0,"lon":-75.0,"reported_speed":20.0}
{"timestamp":"2024-05-01T08:00:01Z","unavailable":"tunnel"}

{"timestamp":"2024-05-01T08:00:02Z","lat":40.0002,"lon":-75.0}
"#;
        let inputs = parse_replay(contents).unwrap();
        assert_eq!(inputs.len(), 3);
        match &inputs[0] {
            PipelineInput::Fix(fix) => assert_eq!(fix.reported_speed, Some(20.0)),
            other => panic!("expected fix, got {:?}", other),
        }
        assert!(matches!(
            &inputs[1],
            PipelineInput::PositionUnavailable { reason, .. } if reason == "tunnel"
        ));
        match &inputs[2] {
            PipelineInput::Fix(fix) => assert_eq!(fix.reported_speed, None),
            other => panic!("expected fix, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_replay_reports_line_number() {
        let contents = "{\"timestamp\":\"2024-05-01T08:00:00Z\",\"lat\":1,\"lon\":2}\nnot json\n";
        match parse_replay(contents) {
            Err(CliError::ReplayParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
