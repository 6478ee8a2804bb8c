//! Image segmentation and active-fire detection
//!
//! Segmentation runs an ordered fallback chain of strategies and accepts the
//! first result that clears the confidence threshold:
//! 1. Primary hosted scene-segmentation model (mask list)
//! 2. Secondary hosted model with a panoptic vocabulary (mask list)
//! 3. Tertiary general-purpose classifier (label list, no masks)
//! 4. Deterministic heuristic (always accepted, no I/O)
//!
//! Fire and smoke detection runs alongside: the colour heuristic always (on
//! the blocking pool), the hosted fire classifier when one is configured.
//!
//! # Example
//!
//! ```rust,ignore
//! use wildfire_risk_core::segmentation::Segmenter;
//!
//! let segmenter = Segmenter::heuristic_only();
//! let result = segmenter.analyze(&image, &context).await?;
//! ```

mod decoder;
mod fire;
mod heuristic;
mod hosted;
mod strategy;
mod vocabulary;

pub use decoder::{decode_label_scores, decode_regions, mask_coverage, LabelScore, ResponseShape};
pub use fire::{
    rgb_to_hsv, ColorBands, ColorFireDetector, DetectionSource, FireClassifier, FireDetection,
    HostedFireClassifier,
};
pub use heuristic::{has_risk_keywords, HeuristicSegmentation, RISK_KEYWORDS};
pub use hosted::InferenceClient;
pub use strategy::{HostedSegmentation, SegmentationStrategy, StrategyOutcome};
pub use vocabulary::{categorize, fire_signal, normalize_label};

use crate::config::InferenceConfig;
use crate::core_types::{AnalysisContext, ImageSample};
use crate::error::{SegmentationError, StrategyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default acceptance threshold for hosted strategies
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.4;

/// Default time budget for one hosted call
pub const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(10);

/// Region classes the rest of the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentCategory {
    Trees,
    Grass,
    Shrubs,
    Structures,
    Fire,
    Smoke,
}

impl fmt::Display for SegmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentCategory::Trees => "trees",
            SegmentCategory::Grass => "grass",
            SegmentCategory::Shrubs => "shrubs",
            SegmentCategory::Structures => "structures",
            SegmentCategory::Fire => "fire",
            SegmentCategory::Smoke => "smoke",
        };
        f.write_str(name)
    }
}

/// One detected region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Upstream label as reported
    pub label: String,
    /// 0-1
    pub confidence: f32,
    /// Fraction of the image covered, when a mask was available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f32>,
    /// Pixel area, when the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
}

/// Regions grouped by category
pub type RegionMap = BTreeMap<SegmentCategory, Vec<Region>>;

/// Which strategy produced a segmentation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationModel {
    Primary,
    Secondary,
    Tertiary,
    Heuristic,
}

impl fmt::Display for SegmentationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentationModel::Primary => "primary",
            SegmentationModel::Secondary => "secondary",
            SegmentationModel::Tertiary => "tertiary",
            SegmentationModel::Heuristic => "heuristic",
        };
        f.write_str(name)
    }
}

/// A strategy that declined, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub reason: String,
}

impl StrategyAttempt {
    pub fn new(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StrategyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Output of [`Segmenter::analyze`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub regions: RegionMap,
    /// Confidence of the accepted strategy, 0-1
    pub confidence: f32,
    pub model: SegmentationModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub fire: FireDetection,
    pub total_pixels: u32,
    /// Strategies tried before the accepted one
    #[serde(default)]
    pub declined: Vec<StrategyAttempt>,
}

impl SegmentationResult {
    /// Regions of one category (empty when absent)
    pub fn regions_of(&self, category: SegmentCategory) -> &[Region] {
        self.regions.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Why higher-priority strategies were skipped, if any were
    pub fn fallback_reason(&self) -> Option<String> {
        if self.declined.is_empty() {
            return None;
        }
        Some(
            self.declined
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Model identity reported by the health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// Fallback-chain segmenter with concurrent fire detection
pub struct Segmenter {
    strategies: Vec<Box<dyn SegmentationStrategy>>,
    fire_classifier: Option<Box<dyn FireClassifier>>,
    color_detector: ColorFireDetector,
    threshold: f32,
    timeout: Duration,
}

impl Segmenter {
    /// Build a segmenter from an explicit chain
    pub fn new(strategies: Vec<Box<dyn SegmentationStrategy>>) -> Self {
        Self {
            strategies,
            fire_classifier: None,
            color_detector: ColorFireDetector::default(),
            threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            timeout: DEFAULT_STRATEGY_TIMEOUT,
        }
    }

    /// Heuristic segmentation plus colour fire detection; no network
    pub fn heuristic_only() -> Self {
        Self::new(vec![Box::new(HeuristicSegmentation)])
    }

    /// Standard four-stage chain built from configuration
    pub fn from_config(config: &InferenceConfig, http: reqwest::Client) -> Self {
        let client = Arc::new(InferenceClient::with_client(
            http,
            config.base_url.clone(),
            config.token.clone(),
        ));

        let strategies: Vec<Box<dyn SegmentationStrategy>> = vec![
            Box::new(HostedSegmentation::new(
                SegmentationModel::Primary,
                config.primary_model.clone(),
                ResponseShape::MaskList,
                Arc::clone(&client),
            )),
            Box::new(HostedSegmentation::new(
                SegmentationModel::Secondary,
                config.secondary_model.clone(),
                ResponseShape::MaskList,
                Arc::clone(&client),
            )),
            Box::new(HostedSegmentation::new(
                SegmentationModel::Tertiary,
                config.tertiary_model.clone(),
                ResponseShape::LabelList,
                Arc::clone(&client),
            )),
            Box::new(HeuristicSegmentation),
        ];

        let mut segmenter = Self::new(strategies)
            .with_threshold(config.acceptance_threshold)
            .with_timeout(config.timeout());
        if let Some(fire_model) = config.fire_model.as_deref().filter(|m| !m.is_empty()) {
            segmenter = segmenter.with_fire_classifier(Box::new(HostedFireClassifier::new(
                fire_model,
                Arc::clone(&client),
            )));
        }
        segmenter
    }

    pub fn with_fire_classifier(mut self, classifier: Box<dyn FireClassifier>) -> Self {
        self.fire_classifier = Some(classifier);
        self
    }

    pub fn with_color_detector(mut self, detector: ColorFireDetector) -> Self {
        self.color_detector = detector;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured models in chain order, then the fire classifier
    pub fn describe(&self) -> Vec<ModelInfo> {
        let mut models: Vec<ModelInfo> = self
            .strategies
            .iter()
            .map(|s| ModelInfo {
                role: s.name().to_string(),
                model_id: s.model_id().map(str::to_string),
            })
            .collect();
        if let Some(classifier) = &self.fire_classifier {
            models.push(ModelInfo {
                role: "fire".to_string(),
                model_id: Some(classifier.model_id().to_string()),
            });
        }
        models
    }

    /// Segment an image and detect fire/smoke
    ///
    /// Only errors when every strategy declines, which cannot happen while a
    /// terminal strategy ends the chain.
    pub async fn analyze(
        &self,
        image: &ImageSample,
        context: &AnalysisContext,
    ) -> Result<SegmentationResult, SegmentationError> {
        let detector = self.color_detector.clone();
        let sample = image.clone();
        let color_scan = async move {
            tokio::task::spawn_blocking(move || detector.detect(&sample))
                .await
                .unwrap_or_else(|e| {
                    warn!("Colour detection task failed: {}", e);
                    FireDetection::none(DetectionSource::ColorHeuristic, 0.0)
                })
        };

        let (color, chain, hosted_fire) = tokio::join!(
            color_scan,
            self.run_chain(image, context),
            self.classify_fire(image)
        );
        debug!(
            "Colour detection: fire {:.3} ({:.1}% px), smoke {:.3} ({:.1}% px)",
            color.fire_probability,
            color.fire_coverage * 100.0,
            color.smoke_probability,
            color.smoke_coverage * 100.0
        );
        let (outcome, accepted, declined) = chain?;

        let mut fire = match hosted_fire {
            Some(hosted) => color.merge(hosted),
            None => color,
        };
        absorb_region_evidence(&mut fire, &outcome.regions);

        if fire.fire_detected || fire.smoke_detected {
            warn!(
                "Fire evidence: fire={} (p={:.2}) smoke={} (p={:.2}) via {:?}",
                fire.fire_detected,
                fire.fire_probability,
                fire.smoke_detected,
                fire.smoke_probability,
                fire.source
            );
        }

        Ok(SegmentationResult {
            regions: outcome.regions,
            confidence: outcome.confidence,
            model: accepted.model(),
            model_id: accepted.model_id().map(str::to_string),
            fire,
            total_pixels: image.pixel_count(),
            declined,
        })
    }

    async fn run_chain(
        &self,
        image: &ImageSample,
        context: &AnalysisContext,
    ) -> Result<
        (
            StrategyOutcome,
            &dyn SegmentationStrategy,
            Vec<StrategyAttempt>,
        ),
        SegmentationError,
    > {
        let mut declined = Vec::new();

        for strategy in &self.strategies {
            let attempt = tokio::time::timeout(self.timeout, strategy.segment(image, context))
                .await
                .unwrap_or(Err(StrategyError::Timeout(self.timeout)));

            let error = match attempt {
                Ok(outcome) if strategy.is_terminal() || outcome.confidence > self.threshold => {
                    info!(
                        "Segmentation accepted from '{}' (confidence {:.2}, {} categories)",
                        strategy.name(),
                        outcome.confidence,
                        outcome.regions.len()
                    );
                    return Ok((outcome, strategy.as_ref(), declined));
                }
                Ok(outcome) => StrategyError::LowConfidence {
                    confidence: outcome.confidence,
                    threshold: self.threshold,
                },
                Err(e) => e,
            };

            if matches!(error, StrategyError::NotConfigured(_)) {
                debug!("Segmentation strategy '{}' skipped: {}", strategy.name(), error);
            } else {
                warn!(
                    "Segmentation strategy '{}' declined: {}. Falling back.",
                    strategy.name(),
                    error
                );
            }
            declined.push(StrategyAttempt::new(strategy.name(), error.to_string()));
        }

        Err(SegmentationError::Exhausted { attempts: declined })
    }

    async fn classify_fire(&self, image: &ImageSample) -> Option<FireDetection> {
        let classifier = self.fire_classifier.as_ref()?;
        let result = tokio::time::timeout(self.timeout, classifier.classify(image))
            .await
            .unwrap_or(Err(StrategyError::Timeout(self.timeout)));
        match result {
            Ok(detection) => Some(detection),
            Err(StrategyError::NotConfigured(reason)) => {
                debug!("Fire classifier skipped: {}", reason);
                None
            }
            Err(e) => {
                warn!("Fire classifier '{}' failed: {}", classifier.model_id(), e);
                None
            }
        }
    }
}

/// Region confidence at which segmented fire/smoke counts as detected
const REGION_EVIDENCE_CONFIDENCE: f32 = 0.5;

/// OR fire/smoke regions reported by the segmentation model into a detection
fn absorb_region_evidence(fire: &mut FireDetection, regions: &RegionMap) {
    let strongest = |category: SegmentCategory| {
        regions
            .get(&category)
            .into_iter()
            .flatten()
            .map(|r| r.confidence)
            .filter(|&c| c >= REGION_EVIDENCE_CONFIDENCE)
            .reduce(f32::max)
    };

    if let Some(p) = strongest(SegmentCategory::Fire) {
        fire.fire_detected = true;
        fire.fire_probability = fire.fire_probability.max(p);
    }
    if let Some(p) = strongest(SegmentCategory::Smoke) {
        fire.smoke_detected = true;
        fire.smoke_probability = fire.smoke_probability.max(p);
    }
}
