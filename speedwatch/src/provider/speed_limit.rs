//! Remote speed-limit lookup endpoint.
//!
//! Builds request URLs for `GET /speed-limit?lat=..&lon=..` and parses the
//! JSON body:
//!
//! ```text
//! { "speed_limit": 55 | null, "unit": "mph" | "km/h", "road_name": "..." | null,
//!   "source": "openstreetmap" | "estimated" | "tomtom" | "error" }
//! ```
//!
//! A `null` limit means the service has no limit for the location; it is not
//! a failure. A body with `source = "error"` and no limit is the service
//! reporting that its own upstream lookups failed, and is treated as one.

use serde::Deserialize;

use super::types::ProviderError;
use crate::units::SpeedUnit;

/// Source tag the service uses when its upstream lookups all failed.
pub const ERROR_SOURCE: &str = "error";

/// Parsed body of a speed-limit response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeedLimitResponse {
    /// Posted limit, if known.
    #[serde(default)]
    pub speed_limit: Option<f64>,

    /// Unit the limit is expressed in.
    #[serde(default)]
    pub unit: SpeedUnit,

    /// Road name, if known.
    #[serde(default)]
    pub road_name: Option<String>,

    /// Where the service got the value from.
    #[serde(default)]
    pub source: Option<String>,
}

impl SpeedLimitResponse {
    /// The limit rounded to an integer, if present and plausible.
    pub fn limit(&self) -> Option<u32> {
        self.speed_limit
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u32)
    }

    /// True if the service reported an upstream failure instead of an answer.
    pub fn is_upstream_error(&self) -> bool {
        self.limit().is_none() && self.source.as_deref() == Some(ERROR_SOURCE)
    }
}

/// Client-side description of the speed-limit endpoint.
#[derive(Debug, Clone)]
pub struct SpeedLimitApi {
    base_url: String,
}

impl SpeedLimitApi {
    /// Create an API description rooted at `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request URL for a position.
    ///
    /// Coordinates are fixed to 6 decimals (~0.1m) so the URL doubles as a
    /// stable response-cache key.
    pub fn url_for(&self, lat: f64, lon: f64) -> String {
        format!("{}/speed-limit?lat={:.6}&lon={:.6}", self.base_url, lat, lon)
    }

    /// Parse a response body.
    pub fn parse_response(body: &[u8]) -> Result<SpeedLimitResponse, ProviderError> {
        serde_json::from_slice(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("speed-limit body: {}", e)))
    }
}
