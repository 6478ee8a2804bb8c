//! Weather integration and fire-weather indices
//!
//! Fetches current conditions and a forecast for a coordinate, derives the
//! fire-weather index set, and caches the result per rounded coordinate.
//! [`WeatherService::get_fire_weather_data`] never fails: when the provider
//! is unreachable it returns labelled default conditions instead.

pub mod cache;
pub mod indices;
pub mod provider;

pub use cache::{WeatherCache, DEFAULT_WEATHER_TTL};
pub use indices::{
    fwi_ranges, red_flag_warning, FireDangerRating, FireWeatherIndices, RedFlagWarning,
    WarningLevel,
};
pub use provider::{decode_current, decode_forecast, OpenWeatherProvider, WeatherProvider};

use crate::config::WeatherConfig;
use crate::core_types::{Celsius, Hectopascals, Location, MetersPerSecond, Millimeters, Percent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Weather at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature: Celsius,
    /// Relative humidity
    pub humidity: Percent,
    pub wind_speed: MetersPerSecond,
    pub precipitation: Millimeters,
    pub pressure: Hectopascals,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Conditions assumed when no provider data is available
    pub fn default_conditions() -> Self {
        Self {
            temperature: Celsius::new(25.0),
            humidity: Percent::new(50.0),
            wind_speed: MetersPerSecond::new(5.0),
            precipitation: Millimeters::new(0.0),
            pressure: Hectopascals::new(1013.0),
            description: "Default conditions (weather data unavailable)".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Where the current conditions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Live current-conditions endpoint
    Provider,
    /// First forecast point standing in for missing current conditions
    ForecastFallback,
    /// Built-in default conditions
    Default,
}

/// Everything the risk calculator needs to know about the weather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireWeatherData {
    pub current: WeatherSnapshot,
    pub forecast: Vec<WeatherSnapshot>,
    pub fire_weather_indices: FireWeatherIndices,
    /// Human-readable weather risk factors
    pub risk_factors: Vec<String>,
    pub is_real_time: bool,
    pub data_source: DataSource,
}

impl FireWeatherData {
    /// Derive indices and risk factors for a set of conditions
    pub fn new(
        current: WeatherSnapshot,
        forecast: Vec<WeatherSnapshot>,
        is_real_time: bool,
        data_source: DataSource,
    ) -> Self {
        let fire_weather_indices = FireWeatherIndices::from_snapshot(&current);
        let risk_factors = weather_risk_factors(&current, &fire_weather_indices);
        Self {
            current,
            forecast,
            fire_weather_indices,
            risk_factors,
            is_real_time,
            data_source,
        }
    }

    /// Default conditions, flagged as not real-time
    pub fn unavailable() -> Self {
        Self::new(
            WeatherSnapshot::default_conditions(),
            Vec::new(),
            false,
            DataSource::Default,
        )
    }
}

/// Weather conditions worth calling out on their own
fn weather_risk_factors(current: &WeatherSnapshot, indices: &FireWeatherIndices) -> Vec<String> {
    let mut factors = Vec::new();
    if *current.humidity < 30.0 {
        factors.push(format!("Low humidity ({:.0}%)", *current.humidity));
    }
    if *current.wind_speed > 8.0 {
        factors.push(format!("Strong winds ({:.1} m/s)", *current.wind_speed));
    }
    if *current.temperature > 30.0 {
        factors.push(format!("High temperature ({:.1}°C)", *current.temperature));
    }
    if indices.fire_danger_rating >= FireDangerRating::High {
        factors.push(format!("Fire danger rating: {}", indices.fire_danger_rating));
    }
    if indices.red_flag_warning.active {
        factors.push(format!(
            "Red flag conditions ({:?})",
            indices.red_flag_warning.warning_level
        ));
    }
    factors
}

/// Cached, fail-safe access to a weather provider
pub struct WeatherService {
    provider: Option<Arc<dyn WeatherProvider>>,
    cache: Arc<WeatherCache>,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>, cache: Arc<WeatherCache>) -> Self {
        Self {
            provider: Some(provider),
            cache,
        }
    }

    /// Service that always answers with default conditions
    pub fn unavailable(cache: Arc<WeatherCache>) -> Self {
        Self {
            provider: None,
            cache,
        }
    }

    /// OpenWeather-backed service from configuration
    pub fn from_config(
        config: &WeatherConfig,
        http: reqwest::Client,
        cache: Arc<WeatherCache>,
    ) -> Self {
        let provider = OpenWeatherProvider::new(
            http,
            config.base_url.clone(),
            config.api_key.clone(),
            config.timeout(),
        );
        Self::new(Arc::new(provider), cache)
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(WeatherProvider::name)
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Current conditions, forecast and indices for a location
    ///
    /// Never errors; provider failures degrade to default conditions, which
    /// are not cached.
    pub async fn get_fire_weather_data(&self, location: Location) -> FireWeatherData {
        let key = location.cache_key();
        if let Some(cached) = self.cache.get(key) {
            debug!("Weather cache hit for ({:.2}, {:.2})", location.lat, location.lng);
            return cached;
        }

        let Some(provider) = self.provider.as_deref() else {
            return FireWeatherData::unavailable();
        };

        let (current, forecast) =
            tokio::join!(provider.current(location), provider.forecast(location));

        let forecast = match forecast {
            Ok(points) => points,
            Err(e) => {
                warn!("Weather forecast from '{}' failed: {}", provider.name(), e);
                Vec::new()
            }
        };

        let data = match current {
            Ok(current) => FireWeatherData::new(current, forecast, true, DataSource::Provider),
            Err(e) => {
                warn!("Current weather from '{}' failed: {}", provider.name(), e);
                match forecast.first().cloned() {
                    Some(first) => {
                        info!("Using first forecast point as current conditions");
                        FireWeatherData::new(first, forecast, false, DataSource::ForecastFallback)
                    }
                    None => {
                        warn!("No weather data available, using default conditions");
                        return FireWeatherData::unavailable();
                    }
                }
            }
        };

        debug!(
            "Fire weather: FWI {:.1} ({}), red flag {:?}",
            data.fire_weather_indices.fwi,
            data.fire_weather_indices.fire_danger_rating,
            data.fire_weather_indices.red_flag_warning.warning_level
        );
        self.cache.insert(key, data.clone());
        data
    }
}
