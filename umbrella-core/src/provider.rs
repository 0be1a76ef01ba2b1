use crate::{
    Config,
    error::ForecastError,
    model::{Coordinate, DailyForecast},
    provider::open_meteo::OpenMeteoProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

pub(crate) const USER_AGENT: &str = concat!("umbrella/", env!("CARGO_PKG_VERSION"));

/// Source of daily precipitation forecasts.
///
/// Implementations make a single attempt; retrying and falling back to saved
/// data is the caller's business.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn fetch_forecast(
        &self,
        coordinate: &Coordinate,
    ) -> Result<DailyForecast, ForecastError>;
}

/// Construct the forecast provider described by `config`.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let provider = OpenMeteoProvider::new(&config.forecast_url, &config.timezone)?;
    Ok(Box::new(provider))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
