//! `lookup`: resolve the speed limit at one position.

use speedwatch::config::ConfigFile;
use speedwatch::units::SpeedUnit;

use super::common::start_app;
use crate::error::CliError;

/// Arguments for a single lookup.
#[derive(Debug, Clone)]
pub struct LookupArgs {
    pub lat: f64,
    pub lon: f64,
    pub unit: Option<SpeedUnit>,
    pub offline: bool,
    pub json: bool,
}

pub async fn run(config: &ConfigFile, args: LookupArgs) -> Result<(), CliError> {
    let app = start_app(config, args.unit)?;
    if args.offline {
        app.connectivity().set_online(false);
    }

    let unit = app.config().settings.preferred_unit;
    let mut resolver = app.resolver();
    // A fresh resolver is never throttled
    let Some(resolution) = resolver.resolve(args.lat, args.lon, unit).await else {
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        println!("Position:    {:.6}, {:.6}", args.lat, args.lon);
        println!("Speed limit: {}", resolution);
        if let Some(source) = &resolution.source {
            println!("Source:      {}", source);
        }
        println!("Origin:      {:?}", resolution.origin);
    }
    Ok(())
}
