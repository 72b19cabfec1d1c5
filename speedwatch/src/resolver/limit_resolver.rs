//! The limit resolver.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::connectivity::Connectivity;
use super::types::{LimitResolution, ResolutionOrigin, ResolverConfig};
use crate::cache::{FetchOutcome, FetchStrategy, RequestCacheLayer, ResponseClass, ResponseOrigin};
use crate::coord;
use crate::geocache::{CacheHit, GeoCacheStore};
use crate::provider::{SpeedLimitApi, SpeedLimitResponse};
use crate::telemetry::ResolverMetrics;
use crate::units::SpeedUnit;

/// Resolves posted speed limits with network, request cache and geo cache.
///
/// Holds the time of the last attempt so lookups can be throttled; take it
/// by `&mut` from a single pipeline.
pub struct LimitResolver {
    api: SpeedLimitApi,
    layer: RequestCacheLayer,
    geo_cache: Arc<GeoCacheStore>,
    connectivity: Arc<Connectivity>,
    metrics: Arc<ResolverMetrics>,
    config: ResolverConfig,
    last_attempt: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for LimitResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitResolver")
            .field("api", &self.api)
            .field("config", &self.config)
            .field("online", &self.connectivity.is_online())
            .field("last_attempt", &self.last_attempt)
            .finish_non_exhaustive()
    }
}

impl LimitResolver {
    pub fn new(
        api: SpeedLimitApi,
        layer: RequestCacheLayer,
        geo_cache: Arc<GeoCacheStore>,
        connectivity: Arc<Connectivity>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            api,
            layer,
            geo_cache,
            connectivity,
            metrics: Arc::new(ResolverMetrics::new()),
            config,
            last_attempt: None,
        }
    }

    /// Share an existing metrics sink instead of the resolver's own.
    pub fn with_metrics(mut self, metrics: Arc<ResolverMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<ResolverMetrics> {
        &self.metrics
    }

    pub fn geo_cache(&self) -> &Arc<GeoCacheStore> {
        &self.geo_cache
    }

    pub fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Forget the last attempt so the next lookup is not throttled.
    pub fn reset_throttle(&mut self) {
        self.last_attempt = None;
    }

    /// Resolve the limit at a position now.
    ///
    /// Returns `None` if the lookup was throttled.
    pub async fn resolve(
        &mut self,
        lat: f64,
        lon: f64,
        unit: SpeedUnit,
    ) -> Option<LimitResolution> {
        self.resolve_at(lat, lon, unit, Utc::now()).await
    }

    /// Resolve the limit at a position, judging throttle and cache age at `now`.
    pub async fn resolve_at(
        &mut self,
        lat: f64,
        lon: f64,
        unit: SpeedUnit,
        now: DateTime<Utc>,
    ) -> Option<LimitResolution> {
        self.metrics.lookup();

        if let Some(last) = self.last_attempt {
            let since_ms = (now - last).num_milliseconds();
            if since_ms >= 0 && (since_ms as u128) < self.config.min_interval.as_millis() {
                self.metrics.throttled();
                tracing::trace!(since_ms, "Limit lookup throttled");
                return None;
            }
        }
        self.last_attempt = Some(now);

        if let Err(e) = coord::validate(lat, lon) {
            tracing::warn!(error = %e, "Cannot resolve limit for invalid position");
            self.metrics.unknown();
            return Some(LimitResolution::unknown(unit));
        }

        if !self.connectivity.is_online() {
            if let Some(hit) = self.geo_cache.get_at(lat, lon, now).await {
                tracing::debug!(nearby = hit.is_nearby, "Offline, using geo cache");
                return Some(self.cached_resolution(hit, unit));
            }
        }

        match self.fetch(lat, lon, now).await {
            Some((response, origin)) => Some(
                self.accept_response(lat, lon, response, origin, unit, now)
                    .await,
            ),
            None => Some(self.fall_back(lat, lon, unit, now).await),
        }
    }

    /// Fetch and parse the remote answer; `None` on any failure.
    ///
    /// The fetch runs on its own task so a lookup that outlives the timeout
    /// still lands in the response cache for the next call.
    async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
    ) -> Option<(SpeedLimitResponse, ResponseOrigin)> {
        let url = self.api.url_for(lat, lon);
        let layer = self.layer.clone();
        let task_url = url.clone();

        self.metrics.api_call();
        let task = tokio::spawn(async move {
            layer
                .fetch_with(
                    &task_url,
                    ResponseClass::SpeedLimit,
                    FetchStrategy::StaleWhileRevalidate,
                    now,
                )
                .await
        });

        let outcome: FetchOutcome = match tokio::time::timeout(self.config.request_timeout, task)
            .await
        {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                tracing::warn!(url = %url, error = %e, "Speed limit lookup failed");
                self.metrics.api_failure();
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %url, error = %e, "Speed limit lookup task failed");
                self.metrics.api_failure();
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    url = %url,
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "Speed limit lookup timed out"
                );
                self.metrics.timeout();
                return None;
            }
        };

        let response = match SpeedLimitApi::parse_response(&outcome.body) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Unreadable speed limit response");
                self.metrics.api_failure();
                return None;
            }
        };

        if response.is_upstream_error() {
            tracing::warn!(url = %url, "Speed limit service reported an upstream error");
            self.metrics.api_failure();
            return None;
        }

        self.metrics.api_success();
        Some((response, outcome.origin))
    }

    async fn accept_response(
        &self,
        lat: f64,
        lon: f64,
        response: SpeedLimitResponse,
        origin: ResponseOrigin,
        unit: SpeedUnit,
        now: DateTime<Utc>,
    ) -> LimitResolution {
        let (is_cached, origin) = match origin {
            ResponseOrigin::Network => (false, ResolutionOrigin::Network),
            ResponseOrigin::Cache { stale } => (stale, ResolutionOrigin::ResponseCache),
        };

        let Some(raw_limit) = response.limit() else {
            tracing::debug!(lat, lon, "No known limit at position");
            self.metrics.unknown();
            return LimitResolution {
                limit: None,
                unit,
                road_name: response.road_name,
                is_cached,
                is_nearby: false,
                source: response.source,
                origin,
            };
        };

        let limit = unit.convert_limit(raw_limit, response.unit);
        if origin == ResolutionOrigin::Network {
            self.geo_cache
                .put_at(lat, lon, limit, unit, response.road_name.clone(), now)
                .await;
        }

        tracing::debug!(
            limit,
            %unit,
            road = response.road_name.as_deref().unwrap_or(""),
            ?origin,
            "Resolved speed limit"
        );

        LimitResolution {
            limit: Some(limit),
            unit,
            road_name: response.road_name,
            is_cached,
            is_nearby: false,
            source: response.source,
            origin,
        }
    }

    async fn fall_back(
        &self,
        lat: f64,
        lon: f64,
        unit: SpeedUnit,
        now: DateTime<Utc>,
    ) -> LimitResolution {
        match self.geo_cache.get_at(lat, lon, now).await {
            Some(hit) => self.cached_resolution(hit, unit),
            None => {
                tracing::info!(lat, lon, "No speed limit available from network or cache");
                self.metrics.unknown();
                LimitResolution::unknown(unit)
            }
        }
    }

    fn cached_resolution(&self, hit: CacheHit, unit: SpeedUnit) -> LimitResolution {
        self.metrics.cache_hit(hit.is_nearby);
        LimitResolution {
            limit: Some(hit.entry.limit_in(unit)),
            unit,
            road_name: hit.entry.road_name,
            is_cached: true,
            is_nearby: hit.is_nearby,
            source: None,
            origin: ResolutionOrigin::GeoCache,
        }
    }
}
