//! Environmental (weather and season) component of the composite score

use crate::core_types::{clamp_score, Location};
use crate::weather::{FireWeatherData, WarningLevel};
use serde::{Deserialize, Serialize};

/// Environmental risk used when no weather is available
pub const NO_WEATHER_RISK: f32 = 30.0;

/// Component scores behind the environmental risk
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalBreakdown {
    pub wind: f32,
    pub humidity: f32,
    pub temperature: f32,
    pub precipitation_relief: f32,
    pub red_flag_bonus: f32,
    pub seasonal_multiplier: f32,
    /// Final 0-100 environmental risk
    pub total: f32,
}

/// Known fire-season regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSeasonRegion {
    California,
    Mediterranean,
    SoutheastAustralia,
    NorthernHemisphere,
    SouthernHemisphere,
}

impl FireSeasonRegion {
    /// Most specific region containing a location
    pub fn locate(location: Location) -> Self {
        let Location { lat, lng } = location;
        if (32.0..=42.0).contains(&lat) && (-125.0..=-114.0).contains(&lng) {
            FireSeasonRegion::California
        } else if (30.0..=46.0).contains(&lat) && (-10.0..=40.0).contains(&lng) {
            FireSeasonRegion::Mediterranean
        } else if (-44.0..=-28.0).contains(&lat) && (135.0..=154.0).contains(&lng) {
            FireSeasonRegion::SoutheastAustralia
        } else if lat >= 0.0 {
            FireSeasonRegion::NorthernHemisphere
        } else {
            FireSeasonRegion::SouthernHemisphere
        }
    }

    /// Multiplier for a calendar month (1-12)
    pub fn multiplier(self, month: u32) -> f32 {
        match self {
            FireSeasonRegion::California if (6..=11).contains(&month) => 1.3,
            FireSeasonRegion::Mediterranean if (7..=9).contains(&month) => 1.2,
            FireSeasonRegion::SoutheastAustralia if matches!(month, 12 | 1 | 2) => 1.3,
            FireSeasonRegion::NorthernHemisphere if (6..=8).contains(&month) => 1.1,
            FireSeasonRegion::SouthernHemisphere if matches!(month, 12 | 1 | 2) => 1.1,
            _ => 1.0,
        }
    }
}

/// Seasonal multiplier for an optional location
pub fn seasonal_multiplier(location: Option<Location>, month: u32) -> f32 {
    location.map_or(1.0, |l| FireSeasonRegion::locate(l).multiplier(month))
}

/// Environmental risk from weather, location and month
pub fn environmental_risk(
    weather: Option<&FireWeatherData>,
    location: Option<Location>,
    month: u32,
) -> EnvironmentalBreakdown {
    let seasonal_multiplier = seasonal_multiplier(location, month);

    let Some(weather) = weather else {
        return EnvironmentalBreakdown {
            seasonal_multiplier,
            total: clamp_score(NO_WEATHER_RISK * seasonal_multiplier),
            ..Default::default()
        };
    };

    let current = &weather.current;
    let wind = clamp_score(*current.wind_speed / 15.0 * 100.0);
    let humidity = clamp_score((70.0 - *current.humidity) / 60.0 * 100.0);
    let temperature = clamp_score((*current.temperature - 10.0) / 30.0 * 100.0);
    let precipitation = if current.precipitation.is_finite() {
        (*current.precipitation).max(0.0)
    } else {
        0.0
    };
    let precipitation_relief = (precipitation * 10.0).min(40.0);
    let red_flag_bonus = match weather.fire_weather_indices.red_flag_warning.warning_level {
        WarningLevel::None => 0.0,
        WarningLevel::Warning => 10.0,
        WarningLevel::Critical => 20.0,
    };

    let raw = 0.35 * wind + 0.35 * humidity + 0.30 * temperature - precipitation_relief
        + red_flag_bonus;
    let total = clamp_score(clamp_score(raw) * seasonal_multiplier);

    EnvironmentalBreakdown {
        wind,
        humidity,
        temperature,
        precipitation_relief,
        red_flag_bonus,
        seasonal_multiplier,
        total,
    }
}
