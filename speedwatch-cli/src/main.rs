//! SpeedWatch CLI
//!
//! Resolves speed limits, replays recorded drives through the alert
//! pipeline, and manages the geo cache and configuration.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use speedwatch::config::ConfigFile;
use speedwatch::logging::{init_logging, LoggingGuard, LOG_FILE_NAME};
use speedwatch::units::SpeedUnit;

use commands::cache::CacheAction;
use commands::common::{load_config, parse_unit};
use commands::config::ConfigCommands;
use commands::lookup::LookupArgs;
use commands::replay::ReplayArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "speedwatch", version, about = "Speed limit lookup and driver alerts")]
struct Cli {
    /// Path to the config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve the speed limit at a position
    Lookup {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Unit to report in (mph or km/h)
        #[arg(long, value_parser = parse_unit)]
        unit: Option<SpeedUnit>,

        /// Skip the network when the geo cache has an answer
        #[arg(long)]
        offline: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Feed a JSON-lines file of fixes through the alert pipeline
    Replay {
        file: PathBuf,

        #[arg(long, value_parser = parse_unit)]
        unit: Option<SpeedUnit>,

        #[arg(long)]
        offline: bool,

        /// Start with alerts muted
        #[arg(long)]
        muted: bool,

        #[arg(long)]
        json: bool,
    },

    /// Manage the geo cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    // Config commands must work even when the file is broken
    if let Commands::Config { command } = cli.command {
        return commands::config::run(cli.config.as_deref(), command);
    }

    let config = load_config(cli.config.as_deref())?;
    let _guard = setup_logging(&config, cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Output(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        match cli.command {
            Commands::Lookup {
                lat,
                lon,
                unit,
                offline,
                json,
            } => {
                commands::lookup::run(
                    &config,
                    LookupArgs {
                        lat,
                        lon,
                        unit,
                        offline,
                        json,
                    },
                )
                .await
            }
            Commands::Replay {
                file,
                unit,
                offline,
                muted,
                json,
            } => {
                commands::replay::run(
                    &config,
                    ReplayArgs {
                        file,
                        unit,
                        offline,
                        muted,
                        json,
                    },
                )
                .await
            }
            Commands::Cache { action } => commands::cache::run(&config, action).await,
            Commands::Config { .. } => Ok(()),
        }
    })
}

fn setup_logging(config: &ConfigFile, verbose: bool) -> Result<LoggingGuard, CliError> {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    Ok(init_logging(&config.logging.directory, LOG_FILE_NAME, level)?)
}
