//! Pipeline configuration
//!
//! Every component is built from a [`PipelineConfig`]. Values come from
//! `Default`, from a deserialized file, or from `WILDFIRE_*` environment
//! variables via [`PipelineConfig::from_env`]. [`PipelineConfig::offline`]
//! is the preset for running with no hosted services at all.

use crate::core_types::{ImageLimits, DEFAULT_IMAGE_SIDE, DEFAULT_MAX_UPLOAD_BYTES};
use crate::segmentation::{DEFAULT_ACCEPTANCE_THRESHOLD, DEFAULT_STRATEGY_TIMEOUT};
use crate::weather::DEFAULT_WEATHER_TTL;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Hosted inference endpoints and the models tried against them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL; each model is posted to `{base_url}/{model_id}`
    pub base_url: String,
    /// Bearer token; hosted strategies decline when absent
    pub token: Option<String>,
    /// Scene segmentation model returning a mask list
    pub primary_model: String,
    /// Panoptic segmentation model returning a mask list
    pub secondary_model: String,
    /// General image classifier returning label/score pairs
    pub tertiary_model: String,
    /// Optional fire/smoke classifier run alongside segmentation
    pub fire_model: Option<String>,
    /// A strategy is accepted only when its confidence is strictly above this
    pub acceptance_threshold: f32,
    /// Per-strategy request timeout
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            token: None,
            primary_model: "nvidia/segformer-b0-finetuned-ade-512-512".to_string(),
            secondary_model: "facebook/mask2former-swin-base-coco-panoptic".to_string(),
            tertiary_model: "google/vit-base-patch16-224".to_string(),
            fire_model: None,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            timeout_secs: DEFAULT_STRATEGY_TIMEOUT.as_secs(),
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OpenWeather-compatible provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    /// Provider key; without one every lookup falls back to default conditions
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Lifetime of a cached lookup
    pub cache_ttl_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org".to_string(),
            api_key: None,
            timeout_secs: 10,
            cache_ttl_secs: DEFAULT_WEATHER_TTL.as_secs(),
        }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub inference: InferenceConfig,
    pub weather: WeatherConfig,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Square side uploads are resized to
    pub image_side: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            weather: WeatherConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            image_side: DEFAULT_IMAGE_SIDE,
        }
    }
}

impl PipelineConfig {
    /// Offline preset - no hosted inference, no weather provider
    ///
    /// Segmentation runs only the deterministic heuristic and the colour
    /// fire detector; weather lookups answer with default conditions.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            inference: InferenceConfig {
                base_url: String::new(),
                token: None,
                fire_model: None,
                ..InferenceConfig::default()
            },
            weather: WeatherConfig {
                base_url: String::new(),
                api_key: None,
                ..WeatherConfig::default()
            },
            ..Self::default()
        }
    }

    /// Defaults overridden by any `WILDFIRE_*` variables that are set
    ///
    /// Unparseable numeric values are ignored and keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let inference = &mut config.inference;
        override_string(&mut inference.base_url, "WILDFIRE_INFERENCE_URL");
        override_optional(&mut inference.token, "WILDFIRE_INFERENCE_TOKEN");
        override_string(&mut inference.primary_model, "WILDFIRE_PRIMARY_MODEL");
        override_string(&mut inference.secondary_model, "WILDFIRE_SECONDARY_MODEL");
        override_string(&mut inference.tertiary_model, "WILDFIRE_TERTIARY_MODEL");
        override_optional(&mut inference.fire_model, "WILDFIRE_FIRE_MODEL");
        override_parsed(&mut inference.acceptance_threshold, "WILDFIRE_ACCEPTANCE_THRESHOLD");
        override_parsed(&mut inference.timeout_secs, "WILDFIRE_INFERENCE_TIMEOUT_SECS");

        let weather = &mut config.weather;
        override_string(&mut weather.base_url, "WILDFIRE_WEATHER_URL");
        override_optional(&mut weather.api_key, "WILDFIRE_WEATHER_API_KEY");
        override_parsed(&mut weather.timeout_secs, "WILDFIRE_WEATHER_TIMEOUT_SECS");
        override_parsed(&mut weather.cache_ttl_secs, "WILDFIRE_WEATHER_CACHE_TTL_SECS");

        override_parsed(&mut config.max_upload_bytes, "WILDFIRE_MAX_UPLOAD_BYTES");
        override_parsed(&mut config.image_side, "WILDFIRE_IMAGE_SIDE");
        config
    }

    pub fn image_limits(&self) -> ImageLimits {
        ImageLimits {
            max_upload_bytes: self.max_upload_bytes,
            side: self.image_side.max(1),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn override_string(target: &mut String, key: &str) {
    if let Some(value) = env_value(key) {
        *target = value;
    }
}

fn override_optional(target: &mut Option<String>, key: &str) {
    if let Some(value) = env_value(key) {
        *target = Some(value);
    }
}

fn override_parsed<T: FromStr>(target: &mut T, key: &str) {
    if let Some(value) = env_value(key).and_then(|v| v.parse().ok()) {
        *target = value;
    }
}
