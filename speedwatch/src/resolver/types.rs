//! Resolver configuration and results.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::units::SpeedUnit;

/// Minimum time between resolution attempts.
pub const DEFAULT_RESOLVE_INTERVAL: Duration = Duration::from_secs(5);

/// Time after which a remote lookup counts as failed.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolver tuning.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Attempts closer together than this are skipped.
    pub min_interval: Duration,
    /// Timeout around the remote lookup.
    pub request_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_RESOLVE_INTERVAL,
            request_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

/// Where a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOrigin {
    /// Fresh answer from the remote service.
    Network,
    /// Answer from the request cache layer's stored responses.
    ResponseCache,
    /// Answer from the geo cache.
    GeoCache,
    /// Nothing could answer, or the service knows no limit here.
    Unknown,
}

/// Result of resolving the limit at a position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitResolution {
    /// Posted limit in `unit`; `None` if no limit is known.
    pub limit: Option<u32>,
    pub unit: SpeedUnit,
    pub road_name: Option<String>,
    /// True if the value is not a fresh answer for this lookup.
    pub is_cached: bool,
    /// True if the value came from a neighbouring cell.
    pub is_nearby: bool,
    /// Provenance reported by the service, if any.
    pub source: Option<String>,
    pub origin: ResolutionOrigin,
}

impl LimitResolution {
    /// A resolution with no known limit.
    pub fn unknown(unit: SpeedUnit) -> Self {
        Self {
            limit: None,
            unit,
            road_name: None,
            is_cached: false,
            is_nearby: false,
            source: None,
            origin: ResolutionOrigin::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        self.limit.is_some()
    }
}

impl fmt::Display for LimitResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{} {}", limit, self.unit)?,
            None => write!(f, "unknown")?,
        }
        if let Some(road) = &self.road_name {
            write!(f, " on {}", road)?;
        }
        if self.is_nearby {
            write!(f, " (nearby)")?;
        } else if self.is_cached {
            write!(f, " (cached)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let mut r = LimitResolution::unknown(SpeedUnit::Mph);
        assert_eq!(r.to_string(), "unknown");

        r.limit = Some(35);
        r.road_name = Some("Main St".into());
        r.is_cached = true;
        r.is_nearby = true;
        assert_eq!(r.to_string(), "35 mph on Main St (nearby)");
    }
}
