//! Typed errors for each stage of an update cycle.
//!
//! Only [`UpdateError`] ever reaches a caller of [`crate::Advisor::update`]:
//! location failures are absorbed by the resolver, persistence failures by
//! the forecast cache, and forecast failures by the cache fallback.

use reqwest::StatusCode;
use thiserror::Error;

/// Why the position source could not produce a coordinate.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location service unavailable")]
    Unavailable,
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LocationError::Timeout
        } else {
            LocationError::Other(err.to_string())
        }
    }
}

/// A failed forecast fetch. Every variant sends the update cycle to the
/// cache fallback.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Forecast request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to parse forecast JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure of the local key-value store. Never escapes the forecast cache.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Fatal outcome of an update cycle.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("No forecast available for {coordinate_key}: {source}")]
    NoData {
        coordinate_key: String,
        #[source]
        source: ForecastError,
    },
}
