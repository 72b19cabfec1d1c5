//! The configuration file and its sections.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::keys::ConfigKey;
use crate::alert::{
    AlertConfig, DEFAULT_ALERT_DELAY, DEFAULT_MAX_OVER, DEFAULT_REANNOUNCE_INTERVAL,
};
use crate::geocache::{GeoCacheConfig, ENTRY_TTL, MAX_ENTRIES};
use crate::pipeline::DriverSettings;
use crate::resolver::{ResolverConfig, DEFAULT_RESOLVE_TIMEOUT};
use crate::threshold::{ThresholdMode, ZoneTable, DEFAULT_FIXED_OFFSET};
use crate::units::SpeedUnit;

/// Default speed limit service.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8001/api";

const APP_DIR: &str = "speedwatch";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors from loading, saving or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Default location of the configuration file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `[api]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_RESOLVE_TIMEOUT.as_secs(),
        }
    }
}

/// Which threshold mode is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdModeKind {
    #[default]
    Fixed,
    Dynamic,
}

impl fmt::Display for ThresholdModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThresholdModeKind::Fixed => "fixed",
            ThresholdModeKind::Dynamic => "dynamic",
        })
    }
}

impl FromStr for ThresholdModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ThresholdModeKind::Fixed),
            "dynamic" | "zones" => Ok(ThresholdModeKind::Dynamic),
            other => Err(format!("expected fixed or dynamic, got {:?}", other)),
        }
    }
}

/// `[alerts]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    pub preferred_unit: SpeedUnit,
    pub threshold_mode: ThresholdModeKind,
    pub fixed_offset: f64,
    pub zones: ZoneTable,
    pub alert_delay_secs: f64,
    pub max_over: f64,
    pub reannounce_secs: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            preferred_unit: SpeedUnit::default(),
            threshold_mode: ThresholdModeKind::default(),
            fixed_offset: DEFAULT_FIXED_OFFSET,
            zones: ZoneTable::default(),
            alert_delay_secs: DEFAULT_ALERT_DELAY.as_secs_f64(),
            max_over: DEFAULT_MAX_OVER,
            reannounce_secs: DEFAULT_REANNOUNCE_INTERVAL.as_secs(),
        }
    }
}

impl AlertSettings {
    /// The selected threshold mode with its parameters.
    pub fn threshold_mode(&self) -> ThresholdMode {
        match self.threshold_mode {
            ThresholdModeKind::Fixed => ThresholdMode::Fixed(self.fixed_offset),
            ThresholdModeKind::Dynamic => ThresholdMode::Dynamic(self.zones.clone()),
        }
    }

    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            // Validated non-negative and finite when set
            alert_delay: Duration::try_from_secs_f64(self.alert_delay_secs)
                .unwrap_or(DEFAULT_ALERT_DELAY),
            reannounce_interval: Duration::from_secs(self.reannounce_secs),
            max_over: self.max_over,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub max_entries: usize,
    pub ttl_days: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            max_entries: MAX_ENTRIES,
            ttl_days: ENTRY_TTL.as_secs() / 86_400,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir().join("logs"),
            level: "info".to_string(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub api: ApiSettings,
    pub alerts: AlertSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, or defaults if there is no file.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&config_file_path()?)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse INI text. Unknown keys are logged and ignored.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;

        let mut config = Self::default();
        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            for (key, value) in properties.iter() {
                let name = format!("{}.{}", section, key);
                match name.parse::<ConfigKey>() {
                    Ok(key) => key.set(&mut config, value)?,
                    Err(_) => tracing::warn!(key = %name, "Ignoring unknown configuration key"),
                }
            }
        }
        Ok(config)
    }

    /// Geo cache limits from `[cache]`.
    pub fn geo_cache_config(&self) -> GeoCacheConfig {
        GeoCacheConfig {
            max_entries: self.cache.max_entries,
            ttl: Duration::from_secs(self.cache.ttl_days * 86_400),
            ..GeoCacheConfig::default()
        }
    }

    /// Resolver tuning from `[api]`.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            request_timeout: Duration::from_secs(self.api.timeout_secs),
            ..ResolverConfig::default()
        }
    }

    /// Driver settings for the pipeline from `[alerts]`.
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            preferred_unit: self.alerts.preferred_unit,
            threshold_mode: self.alerts.threshold_mode(),
            alert: self.alerts.alert_config(),
        }
    }

    /// Render as INI text.
    pub fn to_ini_string(&self) -> String {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }

        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = ini.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_ini_string()).map_err(io_err)?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.alerts.preferred_unit, SpeedUnit::Mph);
        assert_eq!(config.alerts.threshold_mode(), ThresholdMode::Fixed(5.0));
        assert_eq!(config.alerts.alert_config().alert_delay, Duration::from_secs(3));
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.cache.ttl_days, 7);
        assert!(config.cache.directory.ends_with("speedwatch"));
        assert_eq!(config.geo_cache_config().ttl, ENTRY_TTL);
        assert_eq!(config.resolver_config().request_timeout, DEFAULT_RESOLVE_TIMEOUT);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load(&dir.path().join("nope.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_partial() {
        let config = ConfigFile::parse(
            "[alerts]\npreferred_unit = km/h\nthreshold_mode = dynamic\nalert_delay_secs = 0\n\n[unknown]\nfoo = bar\n",
        )
        .unwrap();

        assert_eq!(config.alerts.preferred_unit, SpeedUnit::Kmh);
        assert_eq!(
            config.alerts.threshold_mode(),
            ThresholdMode::Dynamic(ZoneTable::default())
        );
        assert_eq!(config.alerts.alert_config().alert_delay, Duration::ZERO);
        assert_eq!(config.api, ApiSettings::default());
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        let err = ConfigFile::parse("[cache]\nmax_entries = lots\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.ini");

        let mut config = ConfigFile::default();
        config.api.base_url = "https://limits.example/api".to_string();
        config.alerts.zones.set_boundary(0, 25).unwrap();
        config.cache.directory = dir.path().join("cache");
        config.save(&path).unwrap();

        let reloaded = ConfigFile::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[api\nbase_url = x\n").unwrap();

        match ConfigFile::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
