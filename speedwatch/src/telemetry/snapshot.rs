//! Point-in-time resolver statistics.

use std::fmt;

use serde::Serialize;

/// Copy of the resolver counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    /// Resolve calls, throttled ones included.
    pub lookups: u64,
    pub throttled: u64,
    pub api_calls: u64,
    pub api_successes: u64,
    pub api_failures: u64,
    pub timeouts: u64,
    pub exact_hits: u64,
    pub nearby_hits: u64,
    pub unknown: u64,
}

impl TelemetrySnapshot {
    /// Geo cache hits of either kind.
    pub fn cache_hits(&self) -> u64 {
        self.exact_hits + self.nearby_hits
    }

    /// Share of non-throttled lookups answered from the geo cache.
    pub fn hit_rate_percent(&self) -> f64 {
        percent(self.cache_hits(), self.lookups.saturating_sub(self.throttled))
    }

    /// Share of API calls that returned a usable response.
    pub fn api_success_rate_percent(&self) -> f64 {
        percent(self.api_successes, self.api_calls)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lookups:          {} ({} throttled)", self.lookups, self.throttled)?;
        writeln!(
            f,
            "API calls:        {} ({} ok, {} failed, {} timed out, {:.1}% success)",
            self.api_calls,
            self.api_successes,
            self.api_failures,
            self.timeouts,
            self.api_success_rate_percent()
        )?;
        writeln!(
            f,
            "Geo cache hits:   {} exact, {} nearby ({:.1}% hit rate)",
            self.exact_hits,
            self.nearby_hits,
            self.hit_rate_percent()
        )?;
        write!(f, "Unknown limits:   {}", self.unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_with_no_data() {
        let snap = TelemetrySnapshot::default();
        assert_eq!(snap.hit_rate_percent(), 0.0);
        assert_eq!(snap.api_success_rate_percent(), 0.0);
    }

    #[test]
    fn test_rates() {
        let snap = TelemetrySnapshot {
            lookups: 12,
            throttled: 2,
            api_calls: 8,
            api_successes: 6,
            exact_hits: 3,
            nearby_hits: 1,
            ..Default::default()
        };
        assert!((snap.hit_rate_percent() - 40.0).abs() < 1e-9);
        assert!((snap.api_success_rate_percent() - 75.0).abs() < 1e-9);
        assert!(snap.to_string().contains("3 exact, 1 nearby"));
    }
}
