use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Label used for a position reported by the position source.
pub const YOUR_LOCATION: &str = "Your location";

/// A resolved position. Immutable for the duration of one update cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self { latitude, longitude, label: label.into() }
    }

    /// Cache bucket for this position: lat/lon rounded to 2 decimals, `"lat,lon"`.
    ///
    /// Halves round away from zero (`1.125` -> `"1.13"`), not to even.
    pub fn cache_key(&self) -> String {
        format!("{:.2},{:.2}", round_cents(self.latitude), round_cents(self.longitude))
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Deserialize an explicit `null` as `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Per-day precipitation metrics, index 0 = today, 1 = tomorrow, and so on.
///
/// Field names match the `daily` object of the Open-Meteo response so the
/// provider can deserialize straight into this type. A missing or `null`
/// field reads as empty and `null` elements are kept as `None`; lookups past
/// the end or on `None` yield `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub precipitation_sum: Vec<Option<f64>>,
}

impl DailyForecast {
    pub fn probability_max_percent(&self, index: usize) -> f64 {
        self.precipitation_probability_max.get(index).copied().flatten().unwrap_or(0.0)
    }

    pub fn rainfall_sum_mm(&self, index: usize) -> f64 {
        self.precipitation_sum.get(index).copied().flatten().unwrap_or(0.0)
    }

    pub fn date(&self, index: usize) -> Option<&str> {
        self.time.get(index).map(String::as_str)
    }

    pub fn is_aligned(&self) -> bool {
        self.precipitation_probability_max.len() == self.precipitation_sum.len()
    }
}

/// The last successful fetch for one coordinate key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub coordinate_key: String,
    pub forecast: DailyForecast,
    pub fetched_at_ms: i64,
}

impl CacheEntry {
    pub fn fetched_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.fetched_at_ms).unwrap_or_default()
    }
}

/// Which day of the forecast an update cycle looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayIndex {
    #[default]
    Today,
    Tomorrow,
}

impl DayIndex {
    pub fn index(self) -> usize {
        match self {
            DayIndex::Today => 0,
            DayIndex::Tomorrow => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayIndex::Today => "Today",
            DayIndex::Tomorrow => "Tomorrow",
        }
    }
}

impl std::fmt::Display for DayIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<&str> for DayIndex {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "today" | "0" => Ok(DayIndex::Today),
            "tomorrow" | "1" => Ok(DayIndex::Tomorrow),
            _ => Err(anyhow::anyhow!("Unknown day '{value}'. Use 'today' or 'tomorrow'.")),
        }
    }
}

/// What the user should do, derived from one day's numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub need_umbrella: bool,
    pub emoji: String,
    pub title: String,
    pub subtitle: String,
}

/// Where the forecast behind a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// A cache entry younger than the freshness window.
    Fresh,
    /// Fetched from the provider during this cycle.
    Live,
    /// The fetch failed; the last saved entry was used whatever its age.
    Degraded,
}

impl Freshness {
    pub fn is_degraded(self) -> bool {
        self == Freshness::Degraded
    }
}

/// Result of one update cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub day: DayIndex,
    pub coordinate: Coordinate,
    pub recommendation: Recommendation,
    pub probability_max_percent: f64,
    pub rainfall_sum_mm: f64,
    pub freshness: Freshness,
    pub fetched_at: DateTime<Utc>,
    pub forecast_date: Option<String>,
}
