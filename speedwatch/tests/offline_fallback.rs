//! Offline and degraded-network behaviour of limit resolution.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use speedwatch::coord::{cell_bounds, encode_cell_key, NEIGHBOR_OFFSET_DEG};
use speedwatch::geocache::FileStore;
use speedwatch::resolver::ResolutionOrigin;
use speedwatch::units::SpeedUnit;

/// A point near the top edge of its cell, and a point in the cell above.
fn edge_and_neighbor() -> ((f64, f64), (f64, f64)) {
    let bounds = cell_bounds(&encode_cell_key(37.7749, -122.4194).unwrap()).unwrap();
    let here = (bounds.max_lat - 0.0002, bounds.center().1);
    let neighbor = (here.0 + NEIGHBOR_OFFSET_DEG, here.1);
    assert_ne!(
        encode_cell_key(here.0, here.1).unwrap(),
        encode_cell_key(neighbor.0, neighbor.1).unwrap()
    );
    (here, neighbor)
}

#[tokio::test]
async fn offline_uses_hour_old_neighbor_entry() {
    let (here, neighbor) = edge_and_neighbor();
    let client = ScriptedClient::unreachable();
    let app = memory_app(client.clone(), default_config());

    app.geo_cache()
        .put_at(neighbor.0, neighbor.1, 35, SpeedUnit::Mph, None, t0())
        .await;
    app.connectivity().set_online(false);

    let resolution = app
        .resolver()
        .resolve_at(here.0, here.1, SpeedUnit::Mph, at_secs(3600.0))
        .await
        .unwrap();

    assert_eq!(resolution.limit, Some(35));
    assert!(resolution.is_cached);
    assert!(resolution.is_nearby);
    assert_eq!(resolution.origin, ResolutionOrigin::GeoCache);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn network_failure_falls_back_to_geo_cache() {
    let client = ScriptedClient::answering(&limit_body(45, "mph"));
    let app = memory_app(client.clone(), default_config().with_min_interval(Duration::ZERO));
    let mut resolver = app.resolver();

    let first = resolver
        .resolve_at(37.7749, -122.4194, SpeedUnit::Mph, t0())
        .await
        .unwrap();
    assert_eq!(first.origin, ResolutionOrigin::Network);

    client.go_down();
    // A different point in the same cell misses the response cache
    let second = resolver
        .resolve_at(37.77491, -122.41941, SpeedUnit::Mph, at_secs(60.0))
        .await
        .unwrap();

    assert_eq!(second.limit, Some(45));
    assert!(second.is_cached);
    assert!(!second.is_nearby);
    assert_eq!(second.origin, ResolutionOrigin::GeoCache);
    assert_eq!(app.metrics().snapshot().api_failures, 1);
}

#[tokio::test]
async fn total_miss_is_unknown() {
    let client = ScriptedClient::unreachable();
    let app = memory_app(client, default_config());

    let resolution = app
        .resolver()
        .resolve_at(10.0, 10.0, SpeedUnit::Kmh, t0())
        .await
        .unwrap();

    assert!(!resolution.is_known());
    assert_eq!(resolution.origin, ResolutionOrigin::Unknown);
    assert_eq!(resolution.unit, SpeedUnit::Kmh);
}

#[tokio::test]
async fn geo_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = default_config();

    {
        let client = ScriptedClient::answering(&limit_body(30, "mph"));
        let store = Arc::new(FileStore::new(dir.path()));
        let app = app_with(client, store, config.clone());
        let resolution = app
            .resolver()
            .resolve_at(51.5074, -0.1278, SpeedUnit::Mph, t0())
            .await
            .unwrap();
        assert_eq!(resolution.limit, Some(30));
    }

    let client = ScriptedClient::unreachable();
    let store = Arc::new(FileStore::new(dir.path()));
    let app = app_with(client, store, config);
    app.connectivity().set_online(false);

    assert_eq!(app.geo_cache().len().await, 1);
    let resolution = app
        .resolver()
        .resolve_at(51.5074, -0.1278, SpeedUnit::Kmh, at_secs(120.0))
        .await
        .unwrap();
    assert_eq!(resolution.limit, Some(48));
    assert!(resolution.is_cached);
}
