//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use speedwatch::app::{AppConfig, SpeedWatchApp};
use speedwatch::cache::BoxFuture;
use speedwatch::geocache::{KeyValueStore, MemoryStore};
use speedwatch::provider::{AsyncHttpClient, ProviderError};

pub const BASE_URL: &str = "http://limits.test/api";

/// Speed-limit service stand-in with a swappable answer.
pub struct ScriptedClient {
    response: Mutex<Result<Vec<u8>, ProviderError>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn answering(body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(body.as_bytes().to_vec())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(ProviderError::HttpError("network down".into()))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn go_down(&self) {
        *self.response.lock() = Err(ProviderError::HttpError("network down".into()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AsyncHttpClient for ScriptedClient {
    fn get(&self, _url: &str) -> BoxFuture<'_, Result<Vec<u8>, ProviderError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.response.lock().clone();
        Box::pin(async move { response })
    }
}

pub fn limit_body(limit: u32, unit: &str) -> String {
    format!(
        r#"{{"speed_limit":{},"unit":"{}","road_name":"Route 9","source":"openstreetmap"}}"#,
        limit, unit
    )
}

pub fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub fn at_secs(secs: f64) -> DateTime<Utc> {
    t0() + chrono::Duration::milliseconds((secs * 1000.0) as i64)
}

pub fn app_with(
    client: Arc<ScriptedClient>,
    store: Arc<dyn KeyValueStore>,
    config: AppConfig,
) -> SpeedWatchApp {
    SpeedWatchApp::with_parts(config, client, store)
}

pub fn memory_app(client: Arc<ScriptedClient>, config: AppConfig) -> SpeedWatchApp {
    app_with(client, Arc::new(MemoryStore::new()), config)
}

pub fn default_config() -> AppConfig {
    AppConfig::new(BASE_URL, "/unused").with_request_timeout(Duration::from_secs(2))
}
