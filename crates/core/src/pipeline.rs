//! End-to-end assessment: upload in, [`PipelineReport`] out
//!
//! Input is validated first and is the only thing that can fail. After that
//! segmentation and the weather lookup run concurrently, features are
//! extracted from the accepted segmentation, and the calculator combines
//! everything. If segmentation is exhausted the report still carries a
//! keyword-only assessment.

use crate::config::PipelineConfig;
use crate::core_types::{AnalysisContext, ImageLimits, ImageSample, Location};
use crate::error::{InputError, SegmentationError};
use crate::features::{self, FeatureSet};
use crate::risk::{RiskAssessment, RiskCalculator};
use crate::segmentation::{ModelInfo, SegmentationResult, Segmenter};
use crate::weather::{FireWeatherData, WeatherCache, WeatherService};
use crate::PIPELINE_VERSION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything produced for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub assessment: RiskAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<SegmentationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<FireWeatherData>,
}

/// Health-check payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub pipeline_version: String,
    /// Segmentation chain in priority order, then the fire classifier
    pub models: Vec<ModelInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_provider: Option<String>,
    pub weather_cache_entries: usize,
}

/// The full wildfire risk pipeline
pub struct RiskPipeline {
    segmenter: Segmenter,
    weather: WeatherService,
    calculator: RiskCalculator,
    limits: ImageLimits,
}

impl RiskPipeline {
    pub fn new(
        segmenter: Segmenter,
        weather: WeatherService,
        calculator: RiskCalculator,
        limits: ImageLimits,
    ) -> Self {
        Self {
            segmenter,
            weather,
            calculator,
            limits,
        }
    }

    /// Heuristic segmentation and default weather; never touches the network
    pub fn offline() -> Self {
        Self::new(
            Segmenter::heuristic_only(),
            WeatherService::unavailable(Arc::new(WeatherCache::default())),
            RiskCalculator::new(),
            ImageLimits::default(),
        )
    }

    /// Build every component from configuration
    ///
    /// An empty inference base URL selects heuristic-only segmentation and an
    /// empty weather base URL selects default weather, so
    /// [`PipelineConfig::offline`] yields the same pipeline as [`Self::offline`].
    pub fn from_config(config: &PipelineConfig) -> Self {
        let http = reqwest::Client::new();

        let segmenter = if config.inference.base_url.is_empty() {
            info!("No inference endpoint configured, using heuristic segmentation");
            Segmenter::heuristic_only()
        } else {
            if config.inference.token.is_none() {
                warn!(
                    "Inference endpoint '{}' has no token, hosted strategies will be skipped",
                    config.inference.base_url
                );
            }
            Segmenter::from_config(&config.inference, http.clone())
        };

        let cache = Arc::new(WeatherCache::new(config.weather.cache_ttl()));
        let weather = if config.weather.base_url.is_empty() {
            info!("No weather provider configured, using default conditions");
            WeatherService::unavailable(cache)
        } else {
            WeatherService::from_config(&config.weather, http, cache)
        };

        Self::new(segmenter, weather, RiskCalculator::new(), config.image_limits())
    }

    pub fn limits(&self) -> ImageLimits {
        self.limits
    }

    pub fn weather(&self) -> &WeatherService {
        &self.weather
    }

    /// Assess an encoded upload
    ///
    /// # Errors
    /// [`InputError`] for an empty, oversized or undecodable upload, or a
    /// location outside the valid coordinate range. Nothing downstream of
    /// validation fails.
    pub async fn assess(
        &self,
        upload: &[u8],
        context: AnalysisContext,
    ) -> Result<PipelineReport, InputError> {
        let context = validate_context(context)?;
        let image = ImageSample::from_upload(upload, self.limits)?;
        Ok(self.run(&image, &context).await)
    }

    /// Assess an already-decoded image
    ///
    /// # Errors
    /// [`InputError::InvalidLocation`] for an out-of-range location.
    pub async fn assess_sample(
        &self,
        image: &ImageSample,
        context: AnalysisContext,
    ) -> Result<PipelineReport, InputError> {
        let context = validate_context(context)?;
        Ok(self.run(image, &context).await)
    }

    async fn run(&self, image: &ImageSample, context: &AnalysisContext) -> PipelineReport {
        debug!(
            "Assessing {}x{} image (location: {:?})",
            image.width(),
            image.height(),
            context.location
        );

        let weather_lookup = async {
            match context.location {
                Some(location) => Some(self.weather.get_fire_weather_data(location).await),
                None => None,
            }
        };
        let (segmentation, weather) =
            tokio::join!(self.segmenter.analyze(image, context), weather_lookup);

        let segmentation = match segmentation {
            Ok(result) => result,
            Err(SegmentationError::Exhausted { attempts }) => {
                warn!(
                    "All {} segmentation strategies declined, using keyword estimate",
                    attempts.len()
                );
                let reason = if attempts.is_empty() {
                    "no segmentation strategies configured".to_string()
                } else {
                    attempts
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                };
                let mut assessment = self.calculator.keyword_estimate(context);
                assessment.metadata.fallback_reason = Some(reason);
                return PipelineReport {
                    assessment,
                    segmentation: None,
                    features: None,
                    weather,
                };
            }
        };

        let features = features::extract(&segmentation, image);
        let mut assessment = self
            .calculator
            .calculate_risk(&features, weather.as_ref(), context);
        assessment.metadata.fallback_reason = segmentation.fallback_reason();

        info!(
            "Assessment complete: {:.1} {} via {} segmentation ({:?})",
            assessment.composite_risk_score,
            assessment.risk_category,
            segmentation.model,
            assessment.metadata.data_quality
        );

        PipelineReport {
            assessment,
            segmentation: Some(segmentation),
            features: Some(features),
            weather,
        }
    }

    /// Report the configured models and provider; expired weather entries
    /// are purged so the cache count only reflects live coordinates
    pub fn health_check(&self) -> HealthReport {
        let cache = self.weather.cache();
        let purged = cache.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired weather cache entries", purged);
        }
        HealthReport {
            status: "ok".to_string(),
            pipeline_version: PIPELINE_VERSION.to_string(),
            models: self.segmenter.describe(),
            weather_provider: self.weather.provider_name().map(str::to_string),
            weather_cache_entries: cache.len(),
        }
    }
}

fn validate_context(mut context: AnalysisContext) -> Result<AnalysisContext, InputError> {
    context.location = context.location.map(Location::validate).transpose()?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{DataQuality, RiskCategory};
    use crate::segmentation::SegmentationModel;
    use std::time::Duration;

    #[tokio::test]
    async fn test_offline_pipeline_produces_full_report() {
        let pipeline = RiskPipeline::offline();
        let image = ImageSample::solid(32, 32, [40, 120, 40]).unwrap();
        let report = pipeline
            .assess_sample(&image, AnalysisContext::new())
            .await
            .unwrap();

        let segmentation = report.segmentation.unwrap();
        assert_eq!(segmentation.model, SegmentationModel::Heuristic);
        assert!(report.features.is_some());
        assert!(report.weather.is_none());
        assert!(!report.assessment.emergency_detected);
        assert_eq!(report.assessment.metadata.data_quality, DataQuality::Degraded);
        assert!(report.assessment.composite_risk_score <= 100.0);
    }

    #[tokio::test]
    async fn test_location_brings_default_weather() {
        let pipeline = RiskPipeline::offline();
        let image = ImageSample::solid(16, 16, [40, 120, 40]).unwrap();
        let context = AnalysisContext::new().with_location(Location::new(-33.9, 151.2).unwrap());
        let report = pipeline.assess_sample(&image, context).await.unwrap();

        let weather = report.weather.unwrap();
        assert!(!weather.is_real_time);
    }

    #[tokio::test]
    async fn test_invalid_location_rejected_before_running() {
        let pipeline = RiskPipeline::offline();
        let image = ImageSample::solid(8, 8, [0, 0, 0]).unwrap();
        let context = AnalysisContext {
            location: Some(Location { lat: 95.0, lng: 0.0 }),
            ..AnalysisContext::new()
        };
        let err = pipeline.assess_sample(&image, context).await.unwrap_err();
        assert!(matches!(err, InputError::InvalidLocation { .. }));
    }

    #[tokio::test]
    async fn test_exhausted_chain_uses_keyword_estimate() {
        let pipeline = RiskPipeline::new(
            Segmenter::new(Vec::new()),
            WeatherService::unavailable(Arc::new(WeatherCache::default())),
            RiskCalculator::new(),
            ImageLimits::default(),
        );
        let image = ImageSample::solid(8, 8, [0, 0, 0]).unwrap();
        let report = pipeline
            .assess_sample(&image, AnalysisContext::new().with_filename("smoke_over_ridge.jpg"))
            .await
            .unwrap();

        assert!(report.segmentation.is_none());
        assert!(report.features.is_none());
        assert_eq!(report.assessment.metadata.data_quality, DataQuality::Minimal);
        assert_eq!(report.assessment.risk_category, RiskCategory::High);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_ignores_expired_weather() {
        let pipeline = RiskPipeline::offline();
        let key = Location::new(-33.9, 151.2).unwrap().cache_key();
        pipeline
            .weather()
            .cache()
            .insert(key, FireWeatherData::unavailable());
        assert_eq!(pipeline.health_check().weather_cache_entries, 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(pipeline.health_check().weather_cache_entries, 0);
    }

    #[test]
    fn test_health_check_lists_heuristic() {
        let health = RiskPipeline::offline().health_check();
        assert_eq!(health.status, "ok");
        assert_eq!(health.pipeline_version, PIPELINE_VERSION);
        assert_eq!(health.models.len(), 1);
        assert_eq!(health.models[0].role, "heuristic");
        assert!(health.weather_provider.is_none());
    }
}
