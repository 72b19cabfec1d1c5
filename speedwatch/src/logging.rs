//! Logging setup.
//!
//! Log lines go to a file in the configured directory through a
//! non-blocking writer, and warnings and above are mirrored to stderr.
//! `RUST_LOG` overrides the configured level.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default log file name.
pub const LOG_FILE_NAME: &str = "speedwatch.log";

/// Errors from setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log level {0:?}")]
    InvalidLevel(String),

    #[error("A global logger is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the background log writer alive. Dropping it flushes the file.
#[must_use = "logs stop being written when the guard is dropped"]
pub struct LoggingGuard {
    _worker: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Build the env filter for `level`, letting `RUST_LOG` win when set.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))?;

    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy())
}

/// Install the global subscriber.
pub fn init_logging(
    directory: &Path,
    file_name: &str,
    level: &str,
) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(directory).map_err(|source| LoggingError::CreateDir {
        path: directory.to_path_buf(),
        source,
    })?;

    let filter = build_filter(level)?;
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let timer = LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_target(true);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    let log_file = directory.join(file_name);
    tracing::info!(path = %log_file.display(), "Logging initialized");

    Ok(LoggingGuard {
        _worker: worker,
        log_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_levels() {
        for level in ["trace", "debug", "info", "warn", "error", "INFO"] {
            assert!(build_filter(level).is_ok(), "{level}");
        }
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        assert!(matches!(
            build_filter("loudest"),
            Err(LoggingError::InvalidLevel(_))
        ));
    }
}
