//! The update cycle: resolve a coordinate, get a forecast, decide.
//!
//! Forecast source order for one cycle:
//! 1. a fresh cache entry, unless `force_refresh`;
//! 2. the provider, whose result is written back to the cache;
//! 3. any cache entry regardless of age, reported as [`Freshness::Degraded`].
//!
//! Only when all three come up empty does the cycle fail with
//! [`UpdateError::NoData`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    Config,
    cache::{ForecastCache, is_fresh},
    decision::Thresholds,
    error::UpdateError,
    location::LocationResolver,
    model::{Coordinate, DailyForecast, DayIndex, Freshness, UpdateReport},
    provider::ForecastProvider,
};

#[derive(Debug)]
pub struct Advisor {
    resolver: LocationResolver,
    provider: Box<dyn ForecastProvider>,
    cache: ForecastCache,
    thresholds: Thresholds,
    freshness_window: Duration,
}

impl Advisor {
    pub fn new(
        resolver: LocationResolver,
        provider: Box<dyn ForecastProvider>,
        cache: ForecastCache,
        config: &Config,
    ) -> Self {
        Self {
            resolver,
            provider,
            cache,
            thresholds: config.thresholds,
            freshness_window: config.cache.freshness_window(),
        }
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }

    pub async fn update(
        &self,
        day: DayIndex,
        force_refresh: bool,
    ) -> Result<UpdateReport, UpdateError> {
        tracing::debug!(%day, force_refresh, "resolving location");
        let coordinate = self.resolver.resolve().await;
        let key = coordinate.cache_key();

        let (forecast, fetched_at, freshness) =
            self.forecast_for(&coordinate, &key, force_refresh).await?;

        let index = day.index();
        let probability_max_percent = forecast.probability_max_percent(index);
        let rainfall_sum_mm = forecast.rainfall_sum_mm(index);
        let recommendation = self.thresholds.decide(probability_max_percent, rainfall_sum_mm);

        tracing::debug!(
            %key,
            probability_max_percent,
            rainfall_sum_mm,
            need_umbrella = recommendation.need_umbrella,
            ?freshness,
            "decided"
        );

        Ok(UpdateReport {
            day,
            forecast_date: forecast.date(index).map(str::to_owned),
            coordinate,
            recommendation,
            probability_max_percent,
            rainfall_sum_mm,
            freshness,
            fetched_at,
        })
    }

    async fn forecast_for(
        &self,
        coordinate: &Coordinate,
        key: &str,
        force_refresh: bool,
    ) -> Result<(DailyForecast, DateTime<Utc>, Freshness), UpdateError> {
        if !force_refresh
            && let Some(entry) = self.cache.read(key)
            && is_fresh(&entry, Utc::now().timestamp_millis(), self.freshness_window)
        {
            tracing::debug!(%key, "cache hit");
            let fetched_at = entry.fetched_at();
            return Ok((entry.forecast, fetched_at, Freshness::Fresh));
        }

        tracing::debug!(%key, force_refresh, "no fresh entry, fetching forecast");
        match self.provider.fetch_forecast(coordinate).await {
            Ok(forecast) => {
                let now = Utc::now();
                self.cache.write_at(key, forecast.clone(), now.timestamp_millis());
                Ok((forecast, now, Freshness::Live))
            }
            Err(err) => match self.cache.read(key) {
                Some(entry) => {
                    tracing::warn!(%key, error = %err, "fetch failed, showing last saved result");
                    let fetched_at = entry.fetched_at();
                    Ok((entry.forecast, fetched_at, Freshness::Degraded))
                }
                None => {
                    tracing::debug!(%key, error = %err, "fetch failed with nothing saved");
                    Err(UpdateError::NoData { coordinate_key: key.to_string(), source: err })
                }
            },
        }
    }
}
