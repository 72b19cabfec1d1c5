//! Application bootstrap implementation.
//!
//! `SpeedWatchApp` owns the long-lived shared pieces: the request cache
//! layer, the geo cache, the connectivity flag and the resolver metrics.
//! Resolvers and pipelines built from it all share those pieces, so a
//! lookup made by one is visible to the others.

use std::sync::Arc;

use tracing::info;

use super::config::AppConfig;
use super::error::AppError;
use crate::cache::{MemoryResponseCache, RequestCacheLayer, ResponseCache};
use crate::geocache::{FileStore, GeoCacheStore, KeyValueStore};
use crate::pipeline::SpeedPipeline;
use crate::provider::{AsyncHttpClient, AsyncReqwestClient, SpeedLimitApi};
use crate::resolver::{Connectivity, LimitResolver};
use crate::telemetry::ResolverMetrics;

/// Wired-up application services.
pub struct SpeedWatchApp {
    config: AppConfig,
    layer: RequestCacheLayer,
    geo_cache: Arc<GeoCacheStore>,
    connectivity: Arc<Connectivity>,
    metrics: Arc<ResolverMetrics>,
}

impl std::fmt::Debug for SpeedWatchApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedWatchApp")
            .field("api_base_url", &self.config.api_base_url)
            .field("cache_dir", &self.config.cache_dir)
            .field("online", &self.connectivity.is_online())
            .finish_non_exhaustive()
    }
}

impl SpeedWatchApp {
    /// Start with a reqwest client and a file-backed geo cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or the
    /// HTTP client cannot be built.
    pub fn start(config: AppConfig) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.cache_dir).map_err(|source| {
            AppError::CacheDirectory {
                path: config.cache_dir.clone(),
                source,
            }
        })?;

        let client = AsyncReqwestClient::with_timeout(config.resolver.request_timeout)?;
        let store = FileStore::new(config.cache_dir.clone());

        Ok(Self::with_parts(config, Arc::new(client), Arc::new(store)))
    }

    /// Assemble from an explicit client and storage backend.
    pub fn with_parts(
        config: AppConfig,
        client: Arc<dyn AsyncHttpClient>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let responses: Arc<dyn ResponseCache> =
            Arc::new(MemoryResponseCache::new(config.response_cache_entries));
        let layer = RequestCacheLayer::new(client, responses);
        let geo_cache = Arc::new(GeoCacheStore::new(store, config.geo_cache.clone()));

        info!(
            api = %config.api_base_url,
            cache_dir = %config.cache_dir.display(),
            max_entries = config.geo_cache.max_entries,
            "SpeedWatch services started"
        );

        Self {
            config,
            layer,
            geo_cache,
            connectivity: Arc::new(Connectivity::default()),
            metrics: Arc::new(ResolverMetrics::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn geo_cache(&self) -> &Arc<GeoCacheStore> {
        &self.geo_cache
    }

    pub fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }

    pub fn metrics(&self) -> &Arc<ResolverMetrics> {
        &self.metrics
    }

    /// A resolver sharing this app's caches, connectivity and metrics.
    pub fn resolver(&self) -> LimitResolver {
        LimitResolver::new(
            SpeedLimitApi::new(self.config.api_base_url.clone()),
            self.layer.clone(),
            Arc::clone(&self.geo_cache),
            Arc::clone(&self.connectivity),
            self.config.resolver.clone(),
        )
        .with_metrics(Arc::clone(&self.metrics))
    }

    /// A pipeline over a fresh resolver with the configured driver settings.
    pub fn pipeline(&self) -> SpeedPipeline {
        SpeedPipeline::new(self.resolver(), self.config.settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocache::MemoryStore;
    use crate::provider::MockAsyncHttpClient;
    use crate::units::SpeedUnit;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn app(client: Arc<MockAsyncHttpClient>) -> SpeedWatchApp {
        let config = AppConfig::new("http://limits.test/api", "/unused")
            .with_min_interval(Duration::ZERO);
        SpeedWatchApp::with_parts(config, client, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_resolvers_share_geo_cache_and_metrics() {
        let client = Arc::new(MockAsyncHttpClient::ok(
            r#"{"speed_limit":45,"unit":"mph","road_name":"Main St","source":"osm"}"#,
        ));
        let app = app(Arc::clone(&client));
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let mut first = app.resolver();
        let resolved = first
            .resolve_at(40.0, -75.0, SpeedUnit::Mph, now)
            .await
            .unwrap();
        assert_eq!(resolved.limit, Some(45));

        app.connectivity().set_online(false);
        client.set_response(Err(crate::provider::ProviderError::HttpError("down".into())));

        let mut second = app.resolver();
        let cached = second
            .resolve_at(40.0, -75.0, SpeedUnit::Mph, now)
            .await
            .unwrap();
        assert_eq!(cached.limit, Some(45));
        assert!(cached.is_cached);
        assert_eq!(app.metrics().snapshot().lookups, 2);
        assert_eq!(app.geo_cache().len().await, 1);
    }

    #[test]
    fn test_start_creates_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("nested/cache");
        let app = SpeedWatchApp::start(AppConfig::new("http://localhost:8001/api", &cache_dir))
            .unwrap();
        assert!(cache_dir.is_dir());
        assert_eq!(app.config().cache_dir, cache_dir);
    }
}
