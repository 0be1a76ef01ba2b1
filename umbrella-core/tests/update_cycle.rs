//! End-to-end update cycles against scripted providers and an in-memory cache.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use umbrella_core::{
    Advisor, Config, Coordinate, DailyForecast, DayIndex, ForecastCache, ForecastError,
    ForecastProvider, Freshness, KeyValueStore, LocationResolver, PersistenceError, Position,
    UpdateError,
    location::{FixedLocator, NoLocator},
    provider::open_meteo::OpenMeteoProvider,
};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

const MINUTE_MS: i64 = 60 * 1000;
const LONDON: Position = Position { latitude: 51.5072, longitude: -0.1276 };
const LONDON_KEY: &str = "51.51,-0.13";

/// Answers every fetch with the same forecast, or fails when it has none.
#[derive(Debug, Clone)]
struct ScriptedProvider {
    forecast: Option<DailyForecast>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    fn ok(forecast: DailyForecast) -> Self {
        Self { forecast: Some(forecast), calls: Arc::default() }
    }

    fn offline() -> Self {
        Self { forecast: None, calls: Arc::default() }
    }
}

#[async_trait]
impl ForecastProvider for ScriptedProvider {
    async fn fetch_forecast(
        &self,
        _coordinate: &Coordinate,
    ) -> Result<DailyForecast, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.forecast.clone().ok_or_else(|| ForecastError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "offline".to_string(),
        })
    }
}

fn forecast(probability: [f64; 2], sum: [f64; 2]) -> DailyForecast {
    DailyForecast {
        time: vec!["2026-10-16".into(), "2026-10-17".into()],
        precipitation_probability_max: probability.map(Some).to_vec(),
        precipitation_sum: sum.map(Some).to_vec(),
    }
}

fn dry() -> DailyForecast {
    forecast([5.0, 10.0], [0.0, 0.0])
}

fn wet_tomorrow() -> DailyForecast {
    forecast([10.0, 80.0], [0.0, 6.5])
}

/// Storage that fails every read and write, like a full or locked disk.
#[derive(Debug)]
struct UnwritableStore;

impl KeyValueStore for UnwritableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
        Err(PersistenceError::Io(std::io::Error::other("permission denied")))
    }

    fn set(&self, _key: &str, _value: String) -> Result<(), PersistenceError> {
        Err(PersistenceError::Io(std::io::Error::other("no space left on device")))
    }
}

fn advisor(provider: ScriptedProvider) -> Advisor {
    advisor_with(Box::new(provider), ForecastCache::in_memory())
}

fn advisor_with(provider: Box<dyn ForecastProvider>, cache: ForecastCache) -> Advisor {
    let config = Config::default();
    let resolver = LocationResolver::new(
        Box::new(FixedLocator(LONDON)),
        config.fallback.coordinate(),
        Duration::from_secs(7),
        Duration::from_secs(60),
    );
    Advisor::new(resolver, provider, cache, &config)
}

fn minutes_ago(minutes: i64) -> i64 {
    Utc::now().timestamp_millis() - minutes * MINUTE_MS
}

#[tokio::test]
async fn empty_cache_fetches_and_saves() {
    let provider = ScriptedProvider::ok(wet_tomorrow());
    let calls = provider.calls.clone();
    let advisor = advisor(provider);

    let report = advisor.update(DayIndex::Tomorrow, false).await.expect("live forecast");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.freshness, Freshness::Live);
    assert_eq!(report.coordinate.label, "Your location");
    assert!(report.recommendation.need_umbrella);
    assert_eq!(report.probability_max_percent, 80.0);
    assert_eq!(report.rainfall_sum_mm, 6.5);
    assert_eq!(report.forecast_date.as_deref(), Some("2026-10-17"));

    let saved = advisor.cache().read(LONDON_KEY).expect("fetched forecast is cached");
    assert_eq!(saved.forecast, wet_tomorrow());
}

#[tokio::test]
async fn fresh_entry_skips_the_network() {
    let provider = ScriptedProvider::ok(wet_tomorrow());
    let calls = provider.calls.clone();
    let advisor = advisor(provider);
    advisor.cache().write_at(LONDON_KEY, dry(), minutes_ago(10));

    let report = advisor.update(DayIndex::Tomorrow, false).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.freshness, Freshness::Fresh);
    assert!(!report.recommendation.need_umbrella);
}

#[tokio::test]
async fn force_refresh_bypasses_fresh_entry() {
    let provider = ScriptedProvider::ok(wet_tomorrow());
    let calls = provider.calls.clone();
    let advisor = advisor(provider);
    advisor.cache().write_at(LONDON_KEY, dry(), minutes_ago(1));

    let report = advisor.update(DayIndex::Tomorrow, true).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.freshness, Freshness::Live);
    assert!(report.recommendation.need_umbrella);
}

#[tokio::test]
async fn stale_entry_triggers_a_fetch() {
    let provider = ScriptedProvider::ok(wet_tomorrow());
    let calls = provider.calls.clone();
    let advisor = advisor(provider);
    advisor.cache().write_at(LONDON_KEY, dry(), minutes_ago(31));

    let report = advisor.update(DayIndex::Tomorrow, false).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.freshness, Freshness::Live);

    let saved = advisor.cache().read(LONDON_KEY).unwrap();
    assert!(saved.fetched_at_ms > minutes_ago(1));
}

#[tokio::test]
async fn failed_fetch_serves_old_entry_as_degraded() {
    let advisor = advisor(ScriptedProvider::offline());
    let saved_at = minutes_ago(6 * 60);
    advisor.cache().write_at(LONDON_KEY, wet_tomorrow(), saved_at);

    let report = advisor.update(DayIndex::Tomorrow, false).await.expect("degraded result");

    assert_eq!(report.freshness, Freshness::Degraded);
    assert!(report.recommendation.need_umbrella);
    assert_eq!(report.fetched_at.timestamp_millis(), saved_at);

    // The fallback must not refresh the saved timestamp.
    assert_eq!(advisor.cache().read(LONDON_KEY).unwrap().fetched_at_ms, saved_at);
}

#[tokio::test]
async fn forced_refresh_while_offline_still_falls_back() {
    let advisor = advisor(ScriptedProvider::offline());
    advisor.cache().write_at(LONDON_KEY, dry(), minutes_ago(2));

    let report = advisor.update(DayIndex::Today, true).await.unwrap();
    assert_eq!(report.freshness, Freshness::Degraded);
}

#[tokio::test]
async fn failed_fetch_with_nothing_saved_is_no_data() {
    let advisor = advisor(ScriptedProvider::offline());

    let err = advisor.update(DayIndex::Today, false).await.unwrap_err();

    match err {
        UpdateError::NoData { coordinate_key, source } => {
            assert_eq!(coordinate_key, LONDON_KEY);
            assert!(matches!(source, ForecastError::Status { .. }));
        }
    }
}

#[tokio::test]
async fn short_response_reads_missing_day_as_zero() {
    let one_day = DailyForecast {
        time: vec!["2026-10-16".into()],
        precipitation_probability_max: vec![Some(90.0)],
        precipitation_sum: vec![Some(12.0)],
    };
    let advisor = advisor(ScriptedProvider::ok(one_day));

    let report = advisor.update(DayIndex::Tomorrow, false).await.unwrap();

    assert_eq!(report.probability_max_percent, 0.0);
    assert_eq!(report.rainfall_sum_mm, 0.0);
    assert!(!report.recommendation.need_umbrella);
    assert_eq!(report.forecast_date, None);
}

#[tokio::test]
async fn null_daily_object_is_a_live_no_umbrella_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"latitude": 51.5, "daily": null}"#),
        )
        .mount(&server)
        .await;

    let provider = OpenMeteoProvider::new(&server.uri(), "auto").unwrap();
    let advisor = advisor_with(Box::new(provider), ForecastCache::in_memory());

    let report = advisor.update(DayIndex::Today, false).await.expect("lenient parse");

    assert_eq!(report.freshness, Freshness::Live);
    assert_eq!(report.probability_max_percent, 0.0);
    assert_eq!(report.rainfall_sum_mm, 0.0);
    assert!(!report.recommendation.need_umbrella);
    assert_eq!(report.recommendation.title, "No umbrella needed");

    let saved = advisor.cache().read(LONDON_KEY).expect("empty forecast is still cached");
    assert_eq!(saved.forecast, DailyForecast::default());
}

#[tokio::test]
async fn broken_storage_never_blocks_a_live_report() {
    let provider = ScriptedProvider::ok(wet_tomorrow());
    let calls = provider.calls.clone();
    let advisor = advisor_with(Box::new(provider), ForecastCache::new(Box::new(UnwritableStore)));

    let report = advisor.update(DayIndex::Tomorrow, false).await.expect("live forecast");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.freshness, Freshness::Live);
    assert!(report.recommendation.need_umbrella);
    assert_eq!(report.probability_max_percent, 80.0);
    assert_eq!(report.rainfall_sum_mm, 6.5);
    assert!(advisor.cache().read(LONDON_KEY).is_none());

    // Nothing was saved, so the next cycle goes back to the network.
    advisor.update(DayIndex::Tomorrow, false).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unavailable_location_uses_fallback_bucket() {
    let config = Config::default();
    let resolver = LocationResolver::new(
        Box::new(NoLocator),
        config.fallback.coordinate(),
        Duration::from_secs(7),
        Duration::from_secs(60),
    );
    let advisor = Advisor::new(
        resolver,
        Box::new(ScriptedProvider::ok(dry())),
        ForecastCache::in_memory(),
        &config,
    );

    let report = advisor.update(DayIndex::Today, false).await.unwrap();

    assert_eq!(report.coordinate.label, "Nairobi, KE");
    assert!(advisor.cache().read("-1.29,36.82").is_some());
}

#[tokio::test]
async fn configured_thresholds_drive_the_decision() {
    let mut config = Config::default();
    config.thresholds.probability_percent = 90.0;
    config.thresholds.rainfall_mm = 10.0;

    let resolver = LocationResolver::new(
        Box::new(FixedLocator(LONDON)),
        config.fallback.coordinate(),
        Duration::from_secs(7),
        Duration::from_secs(60),
    );
    let advisor = Advisor::new(
        resolver,
        Box::new(ScriptedProvider::ok(wet_tomorrow())),
        ForecastCache::in_memory(),
        &config,
    );

    let report = advisor.update(DayIndex::Tomorrow, false).await.unwrap();
    assert!(!report.recommendation.need_umbrella);
}
