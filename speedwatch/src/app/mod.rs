//! Application bootstrap.
//!
//! [`SpeedWatchApp`] wires the HTTP client, response cache, geo cache and
//! connectivity flag together once, then hands out resolvers and pipelines
//! that share them.
//!
//! ```ignore
//! use speedwatch::app::{AppConfig, SpeedWatchApp};
//! use speedwatch::config::ConfigFile;
//!
//! let file = ConfigFile::load_default()?;
//! let app = SpeedWatchApp::start(AppConfig::from_config_file(&file))?;
//! let pipeline = app.pipeline();
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::SpeedWatchApp;
pub use config::AppConfig;
pub use error::AppError;
