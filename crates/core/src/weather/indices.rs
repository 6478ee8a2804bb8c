//! Fire-weather indices derived from a single weather snapshot
//!
//! Moisture codes (FFMC, DMC, DC) are single-observation approximations of
//! the Canadian Forest Fire Weather Index System; there is no day-to-day
//! carry-over because only current conditions are known. ISI, BUI and FWI use
//! the standard Van Wagner (1987) equations on top of them.
//!
//! # Scientific References
//!
//! - Van Wagner, C.E. (1987). "Development and structure of the Canadian Forest
//!   Fire Weather Index System." Forestry Technical Report 35.
//! - Haines, D.A. (1988). "A lower atmosphere severity index for wildland fires."
//!   National Weather Digest, 13(2), 23-27.

use super::WeatherSnapshot;
use crate::core_types::MetersPerSecond;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fire danger rating ranges over FWI
///
/// Each range is half-open: lower bound inclusive, upper bound exclusive.
pub mod fwi_ranges {
    use std::ops::{Range, RangeFrom};

    /// "Low" rating `[0.0, 5.0)`
    pub const LOW: Range<f32> = 0.0..5.0;

    /// "Moderate" rating `[5.0, 11.0)`
    pub const MODERATE: Range<f32> = 5.0..11.0;

    /// "High" rating `[11.0, 21.0)`
    pub const HIGH: Range<f32> = 11.0..21.0;

    /// "Very High" rating `[21.0, 38.0)`
    pub const VERY_HIGH: Range<f32> = 21.0..38.0;

    /// "Extreme" rating `[38.0, ∞)`
    pub const EXTREME: RangeFrom<f32> = 38.0..;
}

/// Fire danger rating bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FireDangerRating {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    Extreme,
}

impl FireDangerRating {
    /// Bucket an FWI value (NaN and negatives read as Low)
    pub fn from_fwi(fwi: f32) -> Self {
        match fwi {
            _ if fwi_ranges::EXTREME.contains(&fwi) => FireDangerRating::Extreme,
            _ if fwi_ranges::VERY_HIGH.contains(&fwi) => FireDangerRating::VeryHigh,
            _ if fwi_ranges::HIGH.contains(&fwi) => FireDangerRating::High,
            _ if fwi_ranges::MODERATE.contains(&fwi) => FireDangerRating::Moderate,
            _ => FireDangerRating::Low,
        }
    }
}

impl fmt::Display for FireDangerRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FireDangerRating::Low => "Low",
            FireDangerRating::Moderate => "Moderate",
            FireDangerRating::High => "High",
            FireDangerRating::VeryHigh => "Very High",
            FireDangerRating::Extreme => "Extreme",
        };
        f.write_str(name)
    }
}

/// Red flag severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningLevel {
    #[default]
    None,
    Warning,
    Critical,
}

/// Red flag warning state for the current conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlagWarning {
    pub active: bool,
    pub warning_level: WarningLevel,
    pub reasons: Vec<String>,
}

/// Red flag thresholds
pub mod red_flag {
    /// Humidity below which a warning is possible (%)
    pub const WARNING_HUMIDITY: f32 = 20.0;
    /// Wind above which a warning is possible (m/s)
    pub const WARNING_WIND: f32 = 8.0;
    /// Humidity at or below which the warning is critical (%)
    pub const CRITICAL_HUMIDITY: f32 = 15.0;
    /// Wind at or above which the warning is critical (m/s)
    pub const CRITICAL_WIND: f32 = 12.0;
}

/// Evaluate red flag conditions
pub fn red_flag_warning(snapshot: &WeatherSnapshot) -> RedFlagWarning {
    let humidity = *snapshot.humidity;
    let wind = *snapshot.wind_speed;

    let warning_level = if humidity <= red_flag::CRITICAL_HUMIDITY
        && wind >= red_flag::CRITICAL_WIND
    {
        WarningLevel::Critical
    } else if humidity < red_flag::WARNING_HUMIDITY && wind > red_flag::WARNING_WIND {
        WarningLevel::Warning
    } else {
        WarningLevel::None
    };

    let reasons = if warning_level == WarningLevel::None {
        Vec::new()
    } else {
        vec![
            format!("Relative humidity {humidity:.0}%"),
            format!("Wind speed {wind:.1} m/s"),
        ]
    };

    RedFlagWarning {
        active: warning_level != WarningLevel::None,
        warning_level,
        reasons,
    }
}

/// Complete index set for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireWeatherIndices {
    /// Fine Fuel Moisture Code, 0-101
    pub ffmc: f32,
    /// Duff Moisture Code
    pub dmc: f32,
    /// Drought Code
    pub dc: f32,
    /// Initial Spread Index
    pub isi: f32,
    /// Buildup Index
    pub bui: f32,
    /// Fire Weather Index
    pub fwi: f32,
    /// Lower-atmosphere instability, 2-6
    pub haines: u8,
    pub fire_danger_rating: FireDangerRating,
    pub red_flag_warning: RedFlagWarning,
}

impl FireWeatherIndices {
    /// Compute all indices from one snapshot
    pub fn from_snapshot(snapshot: &WeatherSnapshot) -> Self {
        let temperature = finite_or(*snapshot.temperature, 0.0);
        let humidity = finite_or(*snapshot.humidity, 0.0).clamp(0.0, 100.0);
        let wind = finite_or(*snapshot.wind_speed, 0.0).max(0.0);
        let precipitation = finite_or(*snapshot.precipitation, 0.0).max(0.0);

        let ffmc = ffmc(temperature, humidity, wind, precipitation);
        let dmc = dmc(temperature, humidity, precipitation);
        let dc = dc(temperature, precipitation);
        let isi = isi(ffmc, *MetersPerSecond::new(wind).to_kmh());
        let bui = bui(dmc, dc);
        let fwi = fwi(isi, bui);

        Self {
            ffmc,
            dmc,
            dc,
            isi,
            bui,
            fwi,
            haines: haines_index(snapshot),
            fire_danger_rating: FireDangerRating::from_fwi(fwi),
            red_flag_warning: red_flag_warning(snapshot),
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Fine Fuel Moisture Code
///
/// Rises with heat and wind, falls with humidity, and drops sharply once
/// rainfall exceeds 0.5 mm.
pub fn ffmc(temperature: f32, humidity: f32, wind_mps: f32, precipitation: f32) -> f32 {
    let mut ffmc = 101.0 - 0.5 * humidity + 0.4 * (temperature - 20.0) + 0.3 * wind_mps;
    if precipitation > 0.5 {
        ffmc -= (precipitation - 0.5) * 8.0;
    }
    ffmc.clamp(0.0, 101.0)
}

/// Duff Moisture Code
///
/// Drying term from the DMC log-drying rate; rainfall above 1.5 mm reduces it.
pub fn dmc(temperature: f32, humidity: f32, precipitation: f32) -> f32 {
    let drying = 1.894 * (temperature + 1.1).max(0.0) * (100.0 - humidity) * 12e-4 * 10.0;
    let mut dmc = 6.0 + drying;
    if precipitation > 1.5 {
        dmc -= 2.0 * (0.92 * precipitation - 1.27);
    }
    dmc.max(0.0)
}

/// Drought Code
///
/// Potential evapotranspiration term; rainfall above 2.8 mm reduces it.
pub fn dc(temperature: f32, precipitation: f32) -> f32 {
    let evapotranspiration = (0.36 * (temperature + 2.8) + 2.0).max(0.0);
    let mut dc = 15.0 + evapotranspiration * 15.0;
    if precipitation > 2.8 {
        dc -= 10.0 * (0.83 * precipitation - 1.27);
    }
    dc.max(0.0)
}

/// Initial Spread Index (Van Wagner)
pub fn isi(ffmc: f32, wind_kmh: f32) -> f32 {
    let moisture = 147.2 * (101.0 - ffmc) / (59.5 + ffmc);
    let wind_function = (0.05039 * wind_kmh.max(0.0)).exp();
    let fine_fuel = 91.9 * (-0.1386 * moisture).exp() * (1.0 + moisture.powf(5.31) / 4.93e7);
    0.208 * wind_function * fine_fuel
}

/// Buildup Index (Van Wagner)
pub fn bui(dmc: f32, dc: f32) -> f32 {
    let denominator = dmc + 0.4 * dc;
    if denominator <= 0.0 {
        return 0.0;
    }
    let bui = if dmc <= 0.4 * dc {
        0.8 * dmc * dc / denominator
    } else {
        dmc - (1.0 - 0.8 * dc / denominator) * (0.92 + (0.0114 * dmc).powf(1.7))
    };
    bui.max(0.0)
}

/// Fire Weather Index (Van Wagner)
pub fn fwi(isi: f32, bui: f32) -> f32 {
    let duff = if bui <= 80.0 {
        0.626 * bui.powf(0.809) + 2.0
    } else {
        1000.0 / (25.0 + 108.64 * (-0.023 * bui).exp())
    };
    let b = 0.1 * isi * duff;
    if b > 1.0 {
        (2.72 * (0.434 * b.ln()).powf(0.647)).exp()
    } else {
        b.max(0.0)
    }
}

/// Haines-style instability index, 2 (stable, moist) to 6 (unstable, dry)
pub fn haines_index(snapshot: &WeatherSnapshot) -> u8 {
    let temperature = *snapshot.temperature;
    let stability = if temperature < 20.0 {
        1
    } else if temperature <= 30.0 {
        2
    } else {
        3
    };

    let dew_point = snapshot.temperature.dew_point(snapshot.humidity);
    let depression = temperature - *dew_point;
    let moisture = if depression.is_nan() || depression < 6.0 {
        1
    } else if depression <= 10.0 {
        2
    } else {
        3
    };

    stability + moisture
}
