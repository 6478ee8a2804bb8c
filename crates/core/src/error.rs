//! Error types for each pipeline concern
//!
//! Only [`InputError`] ever reaches the caller of the pipeline. Strategy,
//! segmentation and weather errors are absorbed by their fallback paths and
//! surface as degraded-quality metadata on the final assessment.

use crate::segmentation::StrategyAttempt;
use std::time::Duration;
use thiserror::Error;

/// Rejection of an upload or request before the pipeline runs
#[derive(Debug, Error)]
pub enum InputError {
    /// Zero-length upload
    #[error("upload is empty")]
    Empty,

    /// Upload larger than the configured limit
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    /// Bytes are not a decodable image
    #[error("upload is not a supported image: {0}")]
    NotAnImage(String),

    /// Raw pixel buffer length disagrees with the declared dimensions
    #[error("pixel buffer of {actual} bytes does not match {width}x{height} RGB")]
    BufferMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },

    /// Latitude/longitude outside the valid range
    #[error("coordinates out of range: lat={lat}, lng={lng}")]
    InvalidLocation { lat: f64, lng: f64 },
}

impl InputError {
    /// Message suitable for showing to the person who uploaded the photo
    pub fn user_message(&self) -> &'static str {
        match self {
            InputError::Empty => "The uploaded file is empty. Please choose a photo.",
            InputError::TooLarge { .. } => "The photo is too large. Please upload a smaller image.",
            InputError::NotAnImage(_) | InputError::BufferMismatch { .. } => {
                "The upload is not a supported image. Please upload a JPEG or PNG photo."
            }
            InputError::InvalidLocation { .. } => {
                "The location is invalid. Latitude must be within ±90 and longitude within ±180."
            }
        }
    }
}

/// Reason a single inference strategy declined to produce a result
#[derive(Debug, Error)]
pub enum StrategyError {
    /// No endpoint or credentials configured for this strategy
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure (DNS, TLS, connection reset, body read)
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status from the inference endpoint
    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },

    /// Per-strategy time budget exhausted
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Response body did not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Response decoded but was not trustworthy enough to accept
    #[error("confidence {confidence:.2} below acceptance threshold {threshold:.2}")]
    LowConfidence { confidence: f32, threshold: f32 },
}

/// Failure of the whole segmentation chain
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Every configured strategy declined
    #[error("all {} segmentation strategies declined", attempts.len())]
    Exhausted { attempts: Vec<StrategyAttempt> },
}

/// Failure to obtain data from the weather provider
#[derive(Debug, Error)]
pub enum WeatherError {
    /// No API key configured
    #[error("weather provider not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("weather provider returned HTTP {status}")]
    Upstream { status: u16 },

    /// Unexpected response shape
    #[error("malformed weather response: {0}")]
    Malformed(String),
}
