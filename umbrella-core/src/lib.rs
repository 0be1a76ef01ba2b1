//! Core library for the `umbrella` CLI.
//!
//! This crate defines:
//! - The umbrella decision rule and its thresholds
//! - Location resolution with a guaranteed fallback
//! - A per-coordinate forecast cache over a best-effort key-value store
//! - The Open-Meteo forecast provider
//! - The update cycle tying them together
//!
//! It is used by `umbrella-cli`, but can also be reused by other binaries or services.

pub mod advisor;
pub mod cache;
pub mod config;
pub mod decision;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;

pub use advisor::Advisor;
pub use cache::{FileStore, ForecastCache, KeyValueStore, MemoryStore, is_fresh};
pub use config::Config;
pub use decision::{Thresholds, decide};
pub use error::{ForecastError, LocationError, PersistenceError, UpdateError};
pub use location::{LocationResolver, Locator, Position};
pub use model::{
    CacheEntry, Coordinate, DailyForecast, DayIndex, Freshness, Recommendation, UpdateReport,
};
pub use provider::ForecastProvider;
