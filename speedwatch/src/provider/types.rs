//! Provider error types.

use thiserror::Error;

/// Errors that can occur while talking to the remote speed-limit service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure or non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The request did not complete within the timeout.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// The response body could not be parsed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client construction or configuration failure.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
