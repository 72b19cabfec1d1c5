//! Helpers shared across CLI commands.

use std::path::{Path, PathBuf};

use speedwatch::app::{AppConfig, SpeedWatchApp};
use speedwatch::config::{config_file_path, ConfigFile};
use speedwatch::units::SpeedUnit;

use crate::error::CliError;

/// Resolve the config path: explicit flag first, then the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config_file_path()?),
    }
}

/// Load the configuration, falling back to defaults when the file is absent.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = resolve_config_path(explicit)?;
    Ok(ConfigFile::load(&path)?)
}

/// Start the application services from a config file.
pub fn start_app(config: &ConfigFile, unit: Option<SpeedUnit>) -> Result<SpeedWatchApp, CliError> {
    let mut app_config = AppConfig::from_config_file(config);
    if let Some(unit) = unit {
        app_config.settings.preferred_unit = unit;
    }
    Ok(SpeedWatchApp::start(app_config)?)
}

/// Parse a unit argument for clap.
pub fn parse_unit(s: &str) -> Result<SpeedUnit, String> {
    s.parse::<SpeedUnit>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/custom.ini");
        assert_eq!(resolve_config_path(Some(&path)).unwrap(), path);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("none.ini"))).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!(parse_unit("kph").unwrap(), SpeedUnit::Kmh);
        assert!(parse_unit("furlongs").is_err());
    }
}
