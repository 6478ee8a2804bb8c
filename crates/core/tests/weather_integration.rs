//! Weather service against a mocked OpenWeather-compatible API

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wildfire_risk_core::core_types::{Celsius, MetersPerSecond, Percent};
use wildfire_risk_core::weather::{DataSource, FireDangerRating, WarningLevel, WeatherProvider};
use wildfire_risk_core::{
    Location, WeatherCache, WeatherConfig, WeatherError, WeatherService, WeatherSnapshot,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(server: &MockServer) -> WeatherConfig {
    WeatherConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        timeout_secs: 5,
        ..WeatherConfig::default()
    }
}

fn service(server: &MockServer) -> WeatherService {
    WeatherService::from_config(
        &config(server),
        reqwest::Client::new(),
        Arc::new(WeatherCache::default()),
    )
}

fn observation(temp: f32, humidity: f32, wind: f32) -> serde_json::Value {
    json!({
        "dt": 1723723200,
        "main": {"temp": temp, "humidity": humidity, "pressure": 1008},
        "wind": {"speed": wind, "deg": 270},
        "weather": [{"description": "clear sky"}]
    })
}

fn sydney() -> Location {
    Location::new(-33.87, 151.21).unwrap()
}

#[tokio::test]
async fn test_live_conditions_and_indices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(observation(38.0, 12.0, 11.0)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [observation(36.0, 15.0, 10.0), observation(30.0, 25.0, 6.0)]
        })))
        .mount(&server)
        .await;

    let weather = service(&server);
    let data = weather.get_fire_weather_data(sydney()).await;

    assert!(data.is_real_time);
    assert_eq!(data.data_source, DataSource::Provider);
    assert_eq!(*data.current.temperature, 38.0);
    assert_eq!(data.forecast.len(), 2);
    assert_eq!(
        data.fire_weather_indices.red_flag_warning.warning_level,
        WarningLevel::Warning
    );
    assert!(data.fire_weather_indices.fire_danger_rating >= FireDangerRating::High);

    // Second call is served from the cache; the mock expects exactly one hit
    let again = weather.get_fire_weather_data(sydney()).await;
    assert_eq!(again, data);
    assert_eq!(weather.cache().len(), 1);
}

#[tokio::test]
async fn test_red_flag_critical_conditions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(observation(30.0, 15.0, 12.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let data = service(&server).get_fire_weather_data(sydney()).await;
    let warning = &data.fire_weather_indices.red_flag_warning;
    assert!(warning.active);
    assert_eq!(warning.warning_level, WarningLevel::Critical);
    assert_eq!(warning.reasons.len(), 2);
    assert!(data.forecast.is_empty());
}

#[tokio::test]
async fn test_provider_outage_returns_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let weather = service(&server);
    let data = weather.get_fire_weather_data(sydney()).await;

    assert!(!data.is_real_time);
    assert_eq!(data.data_source, DataSource::Default);
    assert_eq!(*data.current.temperature, 25.0);
    assert_eq!(*data.current.humidity, 50.0);
    assert_eq!(*data.current.wind_speed, 5.0);
    assert_eq!(*data.current.pressure, 1013.0);
    assert!(weather.cache().is_empty());
}

#[tokio::test]
async fn test_forecast_fills_in_for_failed_current() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"cod\": 429}"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [observation(27.0, 40.0, 4.0)]
        })))
        .mount(&server)
        .await;

    let data = service(&server).get_fire_weather_data(sydney()).await;
    assert!(!data.is_real_time);
    assert_eq!(data.data_source, DataSource::ForecastFallback);
    assert_eq!(*data.current.temperature, 27.0);
}

#[tokio::test]
async fn test_missing_api_key_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = WeatherConfig {
        api_key: None,
        ..config(&server)
    };
    let weather = WeatherService::from_config(
        &config,
        reqwest::Client::new(),
        Arc::new(WeatherCache::default()),
    );
    let data = weather.get_fire_weather_data(sydney()).await;
    assert_eq!(data.data_source, DataSource::Default);
}

struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl WeatherProvider for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn current(&self, _location: Location) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(WeatherSnapshot {
            temperature: Celsius::new(29.0),
            humidity: Percent::new(35.0),
            wind_speed: MetersPerSecond::new(4.0),
            ..WeatherSnapshot::default_conditions()
        })
    }

    async fn forecast(&self, _location: Location) -> Result<Vec<WeatherSnapshot>, WeatherError> {
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn test_cache_expires_after_ttl() {
    let provider = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let cache = Arc::new(WeatherCache::new(Duration::from_secs(300)));
    let weather = WeatherService::new(provider.clone(), cache);

    weather.get_fire_weather_data(sydney()).await;
    // Nearby coordinates round to the same key
    let nearby = Location::new(-33.871, 151.212).unwrap();
    weather.get_fire_weather_data(nearby).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(299)).await;
    weather.get_fire_weather_data(sydney()).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    weather.get_fire_weather_data(sydney()).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}
