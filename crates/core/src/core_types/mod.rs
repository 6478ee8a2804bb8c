//! Core types shared by every pipeline stage

pub mod context;
pub mod sample;
pub mod units;

pub use context::{AnalysisContext, CoordinateKey, Location};
pub use sample::{ImageLimits, ImageSample, DEFAULT_IMAGE_SIDE, DEFAULT_MAX_UPLOAD_BYTES};
pub use units::*;

/// Clamp a score to `[0, 100]`, mapping NaN to 0
#[inline]
pub fn clamp_score(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Clamp a fraction to `[0, 1]`, mapping NaN to 0
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
