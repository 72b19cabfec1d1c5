//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path`
//! for viewing and modifying settings from the command line.

use std::path::Path;

use clap::Subcommand;
use speedwatch::config::{ConfigFile, ConfigKey};

use super::common::resolve_config_path;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., alerts.fixed_offset)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., alerts.fixed_offset)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(config_path: Option<&Path>, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(config_path, &key),
        ConfigCommands::Set { key, value } => run_set(config_path, &key, &value),
        ConfigCommands::List => run_list(config_path),
        ConfigCommands::Path => run_path(config_path),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'speedwatch config list' to see available keys.",
            key
        ))
    })
}

fn run_get(config_path: Option<&Path>, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load(&resolve_config_path(config_path)?)?;
    println!("{}", config_key.get(&config));
    Ok(())
}

fn run_set(config_path: Option<&Path>, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let path = resolve_config_path(config_path)?;

    let mut config = ConfigFile::load(&path)?;
    config_key.set(&mut config, value)?;
    config.save(&path)?;

    println!("Set {} = {}", config_key.name(), config_key.get(&config));
    Ok(())
}

fn run_list(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = ConfigFile::load(&resolve_config_path(config_path)?)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";
    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }
        println!("  {} = {}", key.key_name(), key.get(&config));
    }

    Ok(())
}

fn run_path(config_path: Option<&Path>) -> Result<(), CliError> {
    println!("{}", resolve_config_path(config_path)?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        run(
            Some(&path),
            ConfigCommands::Set {
                key: "alerts.fixed_offset".to_string(),
                value: "8".to_string(),
            },
        )
        .unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.alerts.fixed_offset, 8.0);
    }

    #[test]
    fn test_set_rejects_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        let err = run(
            Some(&path),
            ConfigCommands::Set {
                key: "alerts.preferred_unit".to_string(),
                value: "knots".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_key() {
        let err = run(
            None,
            ConfigCommands::Get {
                key: "nope.nothing".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("config list"));
    }
}
