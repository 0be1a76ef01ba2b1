//! Position lookup with a guaranteed answer.
//!
//! [`LocationResolver::resolve`] is the single place where location failures
//! are absorbed: whatever the [`Locator`] does (error, hang, no capability)
//! the caller gets a [`Coordinate`], falling back to a configured default.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::{sync::Mutex, time::Instant};

use crate::{
    Config,
    config::LocationSource,
    error::LocationError,
    model::{Coordinate, YOUR_LOCATION},
    provider::USER_AGENT,
};

pub const IP_API_URL: &str = "http://ip-api.com/json/";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Something that can report where the user is.
#[async_trait]
pub trait Locator: Send + Sync + Debug {
    async fn locate(&self) -> Result<Position, LocationError>;
}

/// No position capability at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocator;

#[async_trait]
impl Locator for NoLocator {
    async fn locate(&self) -> Result<Position, LocationError> {
        Err(LocationError::Unavailable)
    }
}

/// A position the user typed in.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator(pub Position);

#[async_trait]
impl Locator for FixedLocator {
    async fn locate(&self) -> Result<Position, LocationError> {
        Ok(self.0)
    }
}

/// Approximate position from the public IP address via ip-api.com.
#[derive(Debug, Clone)]
pub struct IpLocator {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLocator {
    pub fn new(url: &str) -> Result<Self, LocationError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { url: url.to_string(), http })
    }
}

#[async_trait]
impl Locator for IpLocator {
    async fn locate(&self) -> Result<Position, LocationError> {
        let res = self
            .http
            .get(&self.url)
            .query(&[("fields", "status,message,lat,lon")])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(LocationError::Other(format!("ip-api returned {}", res.status())));
        }

        let body: IpApiResponse = res.json().await?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(latitude), Some(longitude)) => Ok(Position { latitude, longitude }),
            ("success", _, _) => {
                Err(LocationError::Other("ip-api reply without coordinates".into()))
            }
            _ => {
                tracing::debug!(message = ?body.message, "ip-api could not place this address");
                Err(LocationError::Unavailable)
            }
        }
    }
}

/// Build the position source for `config`, preferring a fixed position.
pub fn locator_from_config(config: &Config) -> Box<dyn Locator> {
    if let Some((latitude, longitude)) = config.location.fixed_position() {
        return Box::new(FixedLocator(Position { latitude, longitude }));
    }

    match config.location.source {
        LocationSource::Ip => match IpLocator::new(IP_API_URL) {
            Ok(locator) => Box::new(locator),
            Err(err) => {
                tracing::warn!(error = %err, "IP locator unavailable");
                Box::new(NoLocator)
            }
        },
        LocationSource::None => Box::new(NoLocator),
    }
}

#[derive(Debug)]
pub struct LocationResolver {
    locator: Box<dyn Locator>,
    fallback: Coordinate,
    timeout: Duration,
    maximum_age: Duration,
    last: Mutex<Option<(Instant, Position)>>,
}

impl LocationResolver {
    pub fn new(
        locator: Box<dyn Locator>,
        fallback: Coordinate,
        timeout: Duration,
        maximum_age: Duration,
    ) -> Self {
        Self { locator, fallback, timeout, maximum_age, last: Mutex::new(None) }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            locator_from_config(config),
            config.fallback.coordinate(),
            config.location.timeout(),
            config.location.maximum_age(),
        )
    }

    /// Current coordinate; never fails and never waits longer than the timeout.
    pub async fn resolve(&self) -> Coordinate {
        match self.position().await {
            Ok(Position { latitude, longitude }) => {
                Coordinate::new(latitude, longitude, YOUR_LOCATION)
            }
            Err(err) => {
                tracing::info!(error = %err, fallback = %self.fallback.label, "using fallback");
                self.fallback.clone()
            }
        }
    }

    async fn position(&self) -> Result<Position, LocationError> {
        let mut last = self.last.lock().await;

        if let Some((at, position)) = *last
            && at.elapsed() <= self.maximum_age
        {
            tracing::debug!("reusing recent position");
            return Ok(position);
        }

        let position = tokio::time::timeout(self.timeout, self.locator.locate())
            .await
            .map_err(|_| LocationError::Timeout)??;

        *last = Some((Instant::now(), position));
        Ok(position)
    }
}
