//! Configuration file handling.
//!
//! Settings live in an INI file at `<config dir>/speedwatch/config.ini`:
//!
//! ```ini
//! [api]
//! base_url = http://localhost:8001/api
//! timeout_secs = 10
//!
//! [alerts]
//! preferred_unit = mph
//! threshold_mode = fixed
//! fixed_offset = 5
//! zones = 0-30:3,30-50:5,50-70:7,70-:10
//! alert_delay_secs = 3
//! max_over = 15
//! reannounce_secs = 10
//!
//! [cache]
//! directory = ~/.cache/speedwatch
//! max_entries = 500
//! ttl_days = 7
//!
//! [logging]
//! directory = ~/.cache/speedwatch/logs
//! level = info
//! ```
//!
//! Every key has a default, so a missing file or a partial file is valid.
//! Keys are addressed as `section.key` through [`ConfigKey`], which is also
//! where values are validated.

mod file;
mod keys;

pub use file::{
    config_file_path, ApiSettings, AlertSettings, CacheSettings, ConfigError, ConfigFile,
    LoggingSettings, ThresholdModeKind, DEFAULT_API_BASE_URL,
};
pub use keys::ConfigKey;
