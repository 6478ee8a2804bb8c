//! Semantic unit types for weather quantities
//!
//! Newtype wrappers keep temperatures, humidities, wind speeds and rainfall
//! from being mixed up when they flow from the weather provider into the
//! fire-weather indices and the risk calculator.
//!
//! # Design Philosophy
//! - All quantities are f32; provider data is never more precise than that
//! - `Deref` to the inner value for arithmetic in formulas
//! - Total ordering via `Ord` (NaN sorts above every value)
//! - Serialize transparently as bare numbers so JSON payloads stay flat
//!
//! # Usage
//! ```
//! use wildfire_risk_core::core_types::units::{MetersPerSecond, Percent};
//!
//! let wind = MetersPerSecond::new(10.0);
//! assert!((*wind.to_kmh() - 36.0).abs() < 1e-4);
//!
//! let humidity = Percent::new(35.0);
//! assert!((humidity.to_fraction() - 0.35).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

macro_rules! scalar_unit {
    ($(#[$meta:meta])* $name:ident, $suffix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(f32);

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Deref for $name {
            type Target = f32;
            #[inline]
            fn deref(&self) -> &f32 {
                &self.0
            }
        }

        impl $name {
            /// Create a new value
            #[inline]
            #[must_use]
            pub const fn new(value: f32) -> Self {
                $name(value)
            }

            /// Get the raw f32 value
            #[inline]
            #[must_use]
            pub fn value(self) -> f32 {
                self.0
            }
        }

        impl From<f32> for $name {
            fn from(v: f32) -> Self {
                $name(v)
            }
        }

        impl From<$name> for f32 {
            fn from(v: $name) -> f32 {
                v.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.1}{}", self.0, $suffix)
            }
        }
    };
}

scalar_unit!(
    /// Air temperature in degrees Celsius
    Celsius,
    "°C"
);

scalar_unit!(
    /// Relative humidity in percent (0-100)
    Percent,
    "%"
);

scalar_unit!(
    /// Wind speed in meters per second (provider default for metric units)
    MetersPerSecond,
    " m/s"
);

scalar_unit!(
    /// Wind speed in kilometres per hour (forestry index formulas)
    KilometersPerHour,
    " km/h"
);

scalar_unit!(
    /// Precipitation depth in millimetres
    Millimeters,
    " mm"
);

scalar_unit!(
    /// Atmospheric pressure in hectopascals
    Hectopascals,
    " hPa"
);

impl Percent {
    /// Convert to a 0-1 fraction
    #[inline]
    #[must_use]
    pub fn to_fraction(self) -> f32 {
        self.0 / 100.0
    }
}

impl MetersPerSecond {
    /// Convert to km/h
    #[inline]
    #[must_use]
    pub fn to_kmh(self) -> KilometersPerHour {
        KilometersPerHour(self.0 * 3.6)
    }
}

impl KilometersPerHour {
    /// Convert to m/s
    #[inline]
    #[must_use]
    pub fn to_mps(self) -> MetersPerSecond {
        MetersPerSecond(self.0 / 3.6)
    }
}

impl Celsius {
    /// Dew point from temperature and relative humidity (Magnus formula)
    #[must_use]
    pub fn dew_point(self, humidity: Percent) -> Celsius {
        const A: f32 = 17.27;
        const B: f32 = 237.7;
        let rh = humidity.0.clamp(1.0, 100.0) / 100.0;
        let gamma = (A * self.0) / (B + self.0) + rh.ln();
        Celsius((B * gamma) / (A - gamma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_conversion_round_trip() {
        let wind = MetersPerSecond::new(12.0);
        let back = wind.to_kmh().to_mps();
        assert!((*back - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_dew_point_saturated_air() {
        // At 100% humidity the dew point equals the air temperature
        let t = Celsius::new(20.0);
        assert!((*t.dew_point(Percent::new(100.0)) - 20.0).abs() < 0.05);
        // Dry air has a much lower dew point
        assert!(*t.dew_point(Percent::new(20.0)) < 0.0);
    }

    #[test]
    fn test_units_serialize_as_numbers() {
        let json = serde_json::to_string(&Percent::new(42.5)).unwrap();
        assert_eq!(json, "42.5");
    }

    #[test]
    fn test_total_ordering_with_nan() {
        let a = Celsius::new(10.0);
        let nan = Celsius::new(f32::NAN);
        assert!(a.max(nan).value().is_nan());
        assert_eq!(a.min(nan), a);
    }
}
