//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use speedwatch::app::AppError;
use speedwatch::config::ConfigError;
use speedwatch::geocache::StoreError;
use speedwatch::logging::LoggingError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, parsed or saved.
    Config(String),

    /// Application services failed to start.
    App(AppError),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// A replay file could not be read.
    ReplayRead { path: PathBuf, source: std::io::Error },

    /// A replay line could not be parsed.
    ReplayParse { line: usize, message: String },

    /// The geo cache store failed.
    Cache(StoreError),

    /// Output could not be serialized.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::ReplayRead { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            CliError::ReplayParse { line, message } => {
                write!(f, "Invalid fix on line {}: {}", line, message)
            }
            CliError::Cache(e) => write!(f, "Geo cache error: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::App(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::ReplayRead { source, .. } => Some(source),
            CliError::Cache(e) => Some(e),
            CliError::Config(_) | CliError::ReplayParse { .. } | CliError::Output(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Cache(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_parse_display() {
        let err = CliError::ReplayParse {
            line: 7,
            message: "missing field `lat`".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid fix on line 7: missing field `lat`");
    }

    #[test]
    fn test_from_config_error() {
        let err: CliError = ConfigError::UnknownKey("x.y".to_string()).into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("x.y"));
    }
}
