use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ForecastError,
    model::{Coordinate, DailyForecast, null_as_default},
};

use super::{ForecastProvider, USER_AGENT, truncate_body};

pub const DAILY_METRICS: &str = "precipitation_probability_max,precipitation_sum";

/// Open-Meteo daily forecast client. Free, no API key.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    timezone: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: &str, timezone: &str) -> anyhow::Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            base_url: base_url.to_string(),
            timezone: timezone.to_string(),
            http,
        })
    }
}

/// Only `daily` is read. A body without it, with `null` in its place, or
/// with short arrays, still parses; missing days read as zero further down.
#[derive(Debug, Default, Deserialize)]
struct OmForecastResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    daily: DailyForecast,
}

/// Any JSON document is accepted, including a bare `null`. Non-JSON is not.
fn parse_body(body: &str) -> Result<DailyForecast, ForecastError> {
    let parsed: Option<OmForecastResponse> = serde_json::from_str(body)?;
    Ok(parsed.unwrap_or_default().daily)
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn fetch_forecast(
        &self,
        coordinate: &Coordinate,
    ) -> Result<DailyForecast, ForecastError> {
        let latitude = coordinate.latitude.to_string();
        let longitude = coordinate.longitude.to_string();

        tracing::debug!(
            %latitude,
            %longitude,
            timezone = %self.timezone,
            "requesting Open-Meteo forecast"
        );

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("daily", DAILY_METRICS),
                ("timezone", self.timezone.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ForecastError::Status { status, body: truncate_body(&body) });
        }

        let daily = parse_body(&body)?;

        if !daily.is_aligned() {
            tracing::warn!(
                probability_days = daily.precipitation_probability_max.len(),
                sum_days = daily.precipitation_sum.len(),
                "Open-Meteo returned misaligned daily arrays"
            );
        }

        Ok(daily)
    }
}
