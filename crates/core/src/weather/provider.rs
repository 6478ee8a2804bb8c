//! Weather data providers
//!
//! [`OpenWeatherProvider`] speaks the OpenWeather-compatible REST API
//! (`/data/2.5/weather` and `/data/2.5/forecast`, metric units).

use super::WeatherSnapshot;
use crate::core_types::{Celsius, Hectopascals, Location, MetersPerSecond, Millimeters, Percent};
use crate::error::WeatherError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Source of current conditions and forecasts
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name for logs and the health check
    fn name(&self) -> &str;

    /// Current conditions at a location
    async fn current(&self, location: Location) -> Result<WeatherSnapshot, WeatherError>;

    /// Upcoming forecast points at a location, earliest first
    async fn forecast(&self, location: Location) -> Result<Vec<WeatherSnapshot>, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f32,
    humidity: f32,
    #[serde(default = "standard_pressure")]
    pressure: f32,
}

fn standard_pressure() -> f32 {
    1013.0
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f32,
}

#[derive(Debug, Default, Deserialize)]
struct RainBlock {
    #[serde(rename = "1h")]
    one_hour: Option<f32>,
    #[serde(rename = "3h")]
    three_hours: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    #[serde(default)]
    description: String,
}

/// One observation as returned by both endpoints
#[derive(Debug, Deserialize)]
struct Observation {
    dt: i64,
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    rain: Option<RainBlock>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<Observation>,
}

impl Observation {
    fn into_snapshot(self) -> Result<WeatherSnapshot, WeatherError> {
        let timestamp = DateTime::<Utc>::from_timestamp(self.dt, 0)
            .ok_or_else(|| WeatherError::Malformed(format!("timestamp {} out of range", self.dt)))?;
        let precipitation = self
            .rain
            .and_then(|r| r.one_hour.or(r.three_hours))
            .unwrap_or(0.0);
        let description = self
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .unwrap_or_default();

        Ok(WeatherSnapshot {
            temperature: Celsius::new(self.main.temp),
            humidity: Percent::new(self.main.humidity.clamp(0.0, 100.0)),
            wind_speed: MetersPerSecond::new(self.wind.speed.max(0.0)),
            precipitation: Millimeters::new(precipitation.max(0.0)),
            pressure: Hectopascals::new(self.main.pressure),
            description,
            timestamp,
        })
    }
}

/// Decode a current-conditions body
pub fn decode_current(body: &[u8]) -> Result<WeatherSnapshot, WeatherError> {
    parse::<Observation>(body)?.into_snapshot()
}

/// Decode a forecast body
pub fn decode_forecast(body: &[u8]) -> Result<Vec<WeatherSnapshot>, WeatherError> {
    parse::<ForecastResponse>(body)?
        .list
        .into_iter()
        .map(Observation::into_snapshot)
        .collect()
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, WeatherError> {
    serde_json::from_slice(body).map_err(|e| WeatherError::Malformed(e.to_string()))
}

/// OpenWeather-compatible provider
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenWeatherProvider {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    async fn get(&self, endpoint: &str, location: Location) -> Result<Vec<u8>, WeatherError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| WeatherError::NotConfigured("no weather API key".to_string()))?;

        let url = format!("{}/data/2.5/{}", self.base_url, endpoint);
        debug!("GET {} ({:.4}, {:.4})", url, location.lat, location.lng);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", location.lat.to_string()),
                ("lon", location.lng.to_string()),
                ("units", "metric".to_string()),
                ("appid", api_key.to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn name(&self) -> &str {
        "openweather"
    }

    async fn current(&self, location: Location) -> Result<WeatherSnapshot, WeatherError> {
        decode_current(&self.get("weather", location).await?)
    }

    async fn forecast(&self, location: Location) -> Result<Vec<WeatherSnapshot>, WeatherError> {
        decode_forecast(&self.get("forecast", location).await?)
    }
}
