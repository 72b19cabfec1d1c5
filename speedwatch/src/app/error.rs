//! Application error types.

use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::provider::ProviderError;

/// Errors that can occur while starting the application.
#[derive(Debug)]
pub enum AppError {
    /// Failed to load or validate configuration.
    Config(ConfigError),

    /// Failed to build the HTTP client.
    HttpClient(ProviderError),

    /// The cache directory could not be created.
    CacheDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to set up logging.
    Logging(LoggingError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            AppError::CacheDirectory { path, source } => {
                write!(
                    f,
                    "Failed to create cache directory {}: {}",
                    path.display(),
                    source
                )
            }
            AppError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::HttpClient(e) => Some(e),
            AppError::CacheDirectory { source, .. } => Some(source),
            AppError::Logging(e) => Some(e),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        AppError::HttpClient(e)
    }
}

impl From<LoggingError> for AppError {
    fn from(e: LoggingError) -> Self {
        AppError::Logging(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config(ConfigError::UnknownKey("api.nope".to_string()));
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("api.nope"));
    }

    #[test]
    fn test_app_error_from_provider_error() {
        let app_err: AppError = ProviderError::ConfigError("tls".to_string()).into();
        assert!(matches!(app_err, AppError::HttpClient(_)));
        assert!(app_err.source().is_some());
    }
}
