//! SpeedWatch - speed limit resolution and driver alerting
//!
//! Turns a stream of GPS fixes into a current speed, the posted limit at the
//! current position and an alert state. Limits come from a remote service
//! through a response cache, with a location-indexed geo cache as the
//! offline fallback.
//!
//! # Modules
//!
//! - [`sampler`]: speed estimation from fixes
//! - [`resolver`]: throttled limit lookup with cache fallbacks
//! - [`geocache`]: persisted geohash-indexed limit cache
//! - [`cache`]: request/response cache and fetch strategies
//! - [`threshold`] and [`alert`]: when to warn the driver
//! - [`pipeline`]: the loop tying them together

pub mod alert;
pub mod app;
pub mod cache;
pub mod config;
pub mod coord;
pub mod geocache;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod resolver;
pub mod sampler;
pub mod telemetry;
pub mod threshold;
pub mod trip;
pub mod units;
