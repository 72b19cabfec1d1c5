//! Addressable configuration keys.
//!
//! Every setting in [`ConfigFile`] has a `section.key` name. Values are read
//! and written as strings and validated on set, so the file parser and the
//! `config get|set` commands share one code path.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigError, ConfigFile, ThresholdModeKind};
use crate::threshold::ZoneTable;
use crate::units::SpeedUnit;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ApiBaseUrl,
    ApiTimeoutSecs,
    AlertsPreferredUnit,
    AlertsThresholdMode,
    AlertsFixedOffset,
    AlertsZones,
    AlertsAlertDelaySecs,
    AlertsMaxOver,
    AlertsReannounceSecs,
    CacheDirectory,
    CacheMaxEntries,
    CacheTtlDays,
    LoggingDirectory,
    LoggingLevel,
}

impl ConfigKey {
    /// All keys, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ApiBaseUrl,
            ConfigKey::ApiTimeoutSecs,
            ConfigKey::AlertsPreferredUnit,
            ConfigKey::AlertsThresholdMode,
            ConfigKey::AlertsFixedOffset,
            ConfigKey::AlertsZones,
            ConfigKey::AlertsAlertDelaySecs,
            ConfigKey::AlertsMaxOver,
            ConfigKey::AlertsReannounceSecs,
            ConfigKey::CacheDirectory,
            ConfigKey::CacheMaxEntries,
            ConfigKey::CacheTtlDays,
            ConfigKey::LoggingDirectory,
            ConfigKey::LoggingLevel,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl => "api.base_url",
            ConfigKey::ApiTimeoutSecs => "api.timeout_secs",
            ConfigKey::AlertsPreferredUnit => "alerts.preferred_unit",
            ConfigKey::AlertsThresholdMode => "alerts.threshold_mode",
            ConfigKey::AlertsFixedOffset => "alerts.fixed_offset",
            ConfigKey::AlertsZones => "alerts.zones",
            ConfigKey::AlertsAlertDelaySecs => "alerts.alert_delay_secs",
            ConfigKey::AlertsMaxOver => "alerts.max_over",
            ConfigKey::AlertsReannounceSecs => "alerts.reannounce_secs",
            ConfigKey::CacheDirectory => "cache.directory",
            ConfigKey::CacheMaxEntries => "cache.max_entries",
            ConfigKey::CacheTtlDays => "cache.ttl_days",
            ConfigKey::LoggingDirectory => "logging.directory",
            ConfigKey::LoggingLevel => "logging.level",
        }
    }

    pub fn section(&self) -> &'static str {
        self.split().0
    }

    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        // Every name contains exactly one dot
        self.name().split_once('.').unwrap_or((self.name(), ""))
    }

    /// Current value as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ApiBaseUrl => config.api.base_url.clone(),
            ConfigKey::ApiTimeoutSecs => config.api.timeout_secs.to_string(),
            ConfigKey::AlertsPreferredUnit => config.alerts.preferred_unit.to_string(),
            ConfigKey::AlertsThresholdMode => config.alerts.threshold_mode.to_string(),
            ConfigKey::AlertsFixedOffset => config.alerts.fixed_offset.to_string(),
            ConfigKey::AlertsZones => config.alerts.zones.to_string(),
            ConfigKey::AlertsAlertDelaySecs => config.alerts.alert_delay_secs.to_string(),
            ConfigKey::AlertsMaxOver => config.alerts.max_over.to_string(),
            ConfigKey::AlertsReannounceSecs => config.alerts.reannounce_secs.to_string(),
            ConfigKey::CacheDirectory => config.cache.directory.display().to_string(),
            ConfigKey::CacheMaxEntries => config.cache.max_entries.to_string(),
            ConfigKey::CacheTtlDays => config.cache.ttl_days.to_string(),
            ConfigKey::LoggingDirectory => config.logging.directory.display().to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Validate `value` and store it. The config is untouched on error.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match self {
            ConfigKey::ApiBaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid("must start with http:// or https://"));
                }
                config.api.base_url = value.trim_end_matches('/').to_string();
            }
            ConfigKey::ApiTimeoutSecs => {
                config.api.timeout_secs =
                    parse_positive(value).ok_or_else(|| invalid("must be a positive integer"))?;
            }
            ConfigKey::AlertsPreferredUnit => {
                config.alerts.preferred_unit = value
                    .parse::<SpeedUnit>()
                    .map_err(|_| invalid("must be mph or km/h"))?;
            }
            ConfigKey::AlertsThresholdMode => {
                config.alerts.threshold_mode = value
                    .parse::<ThresholdModeKind>()
                    .map_err(|e| invalid(e.as_str()))?;
            }
            ConfigKey::AlertsFixedOffset => {
                config.alerts.fixed_offset =
                    parse_non_negative(value).ok_or_else(|| invalid("must be a non-negative number"))?;
            }
            ConfigKey::AlertsZones => {
                config.alerts.zones = value
                    .parse::<ZoneTable>()
                    .map_err(|e| invalid(e.to_string().as_str()))?;
            }
            ConfigKey::AlertsAlertDelaySecs => {
                config.alerts.alert_delay_secs =
                    parse_non_negative(value).ok_or_else(|| invalid("must be a non-negative number"))?;
            }
            ConfigKey::AlertsMaxOver => {
                config.alerts.max_over = parse_non_negative(value)
                    .filter(|v| *v > 0.0)
                    .ok_or_else(|| invalid("must be a positive number"))?;
            }
            ConfigKey::AlertsReannounceSecs => {
                config.alerts.reannounce_secs =
                    parse_positive(value).ok_or_else(|| invalid("must be a positive integer"))?;
            }
            ConfigKey::CacheDirectory => {
                if value.is_empty() {
                    return Err(invalid("must not be empty"));
                }
                config.cache.directory = expand_tilde(value);
            }
            ConfigKey::CacheMaxEntries => {
                config.cache.max_entries = parse_positive(value)
                    .and_then(|v| usize::try_from(v).ok())
                    .ok_or_else(|| invalid("must be a positive integer"))?;
            }
            ConfigKey::CacheTtlDays => {
                config.cache.ttl_days =
                    parse_positive(value).ok_or_else(|| invalid("must be a positive integer"))?;
            }
            ConfigKey::LoggingDirectory => {
                if value.is_empty() {
                    return Err(invalid("must not be empty"));
                }
                config.logging.directory = expand_tilde(value);
            }
            ConfigKey::LoggingLevel => {
                let level = value.to_ascii_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(invalid("must be one of trace, debug, info, warn, error"));
                }
                config.logging.level = level;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_positive(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().filter(|v| *v > 0)
}

fn parse_non_negative(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
