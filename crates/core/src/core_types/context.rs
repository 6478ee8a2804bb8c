//! Per-request context: where and when a photo was taken, and what it was called

use crate::error::InputError;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Create a validated location
    ///
    /// # Errors
    /// [`InputError::InvalidLocation`] for non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InputError> {
        Location { lat, lng }.validate()
    }

    /// Re-check a location that arrived through deserialization
    ///
    /// # Errors
    /// [`InputError::InvalidLocation`] for non-finite or out-of-range values.
    pub fn validate(self) -> Result<Self, InputError> {
        let valid = self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng);
        if valid {
            Ok(self)
        } else {
            Err(InputError::InvalidLocation {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }

    /// Cache key rounded to two decimal places (~1 km)
    pub fn cache_key(&self) -> CoordinateKey {
        CoordinateKey {
            lat_centi: (self.lat * 100.0).round() as i32,
            lng_centi: (self.lng * 100.0).round() as i32,
        }
    }
}

/// Coordinates rounded to hundredths of a degree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat_centi: i32,
    lng_centi: i32,
}

/// Everything known about a request besides the pixels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Upload filename or free-text description; a weak hint only
    pub filename: Option<String>,
    /// Where the photo was taken
    pub location: Option<Location>,
    /// When the assessment applies (drives the seasonal multiplier)
    pub observed_at: DateTime<Utc>,
}

impl AnalysisContext {
    /// Context for "now" with no filename or location
    pub fn new() -> Self {
        Self {
            filename: None,
            location: None,
            observed_at: Utc::now(),
        }
    }

    /// Attach a filename or description
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Attach a location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Pin the observation time
    pub fn at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Lower-cased filename used for keyword matching
    pub fn hint_text(&self) -> String {
        self.filename
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Calendar month 1-12 of the observation
    pub fn month(&self) -> u32 {
        self.observed_at.month()
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_location_validation() {
        assert!(Location::new(34.05, -118.24).is_ok());
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -180.5).is_err());
        assert!(Location::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_cache_key_rounds_nearby_points_together() {
        let a = Location::new(34.0522, -118.2437).unwrap();
        let b = Location::new(34.0549, -118.2401).unwrap();
        let c = Location::new(34.0651, -118.2437).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_context_hint_and_month() {
        let ctx = AnalysisContext::new()
            .with_filename("Dry_Brush_Hillside.JPG")
            .at(Utc.with_ymd_and_hms(2024, 8, 15, 12, 0, 0).unwrap());
        assert_eq!(ctx.hint_text(), "dry_brush_hillside.jpg");
        assert_eq!(ctx.month(), 8);
    }
}
