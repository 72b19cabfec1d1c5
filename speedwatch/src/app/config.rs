//! Application configuration for `SpeedWatchApp`.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_MAX_RESPONSES;
use crate::config::ConfigFile;
use crate::geocache::GeoCacheConfig;
use crate::pipeline::DriverSettings;
use crate::resolver::ResolverConfig;

/// Everything needed to wire the resolver and pipeline together.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the speed limit service.
    pub api_base_url: String,

    /// Directory holding the persisted geo cache.
    pub cache_dir: PathBuf,

    /// Geo cache limits.
    pub geo_cache: GeoCacheConfig,

    /// Resolver throttle and timeout.
    pub resolver: ResolverConfig,

    /// Capacity of the in-memory response cache.
    pub response_cache_entries: u64,

    /// Unit, threshold and alert timing.
    pub settings: DriverSettings,
}

impl AppConfig {
    pub fn new(api_base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            cache_dir: cache_dir.into(),
            geo_cache: GeoCacheConfig::default(),
            resolver: ResolverConfig::default(),
            response_cache_entries: DEFAULT_MAX_RESPONSES,
            settings: DriverSettings::default(),
        }
    }

    /// Build from a loaded configuration file.
    pub fn from_config_file(file: &ConfigFile) -> Self {
        Self {
            api_base_url: file.api.base_url.clone(),
            cache_dir: file.cache.directory.clone(),
            geo_cache: file.geo_cache_config(),
            resolver: file.resolver_config(),
            response_cache_entries: DEFAULT_MAX_RESPONSES,
            settings: file.driver_settings(),
        }
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.resolver.min_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.resolver.request_timeout = timeout;
        self
    }
}
