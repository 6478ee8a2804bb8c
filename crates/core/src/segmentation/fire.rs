//! Active fire and smoke detection
//!
//! Two independent sources feed one [`FireDetection`]:
//! - a pixel-colour heuristic that always runs (no I/O, cannot fail)
//! - an optional hosted fire/smoke classifier
//!
//! The more confident source supplies the probabilities, but positive
//! detections are OR'd: a missed fire costs far more than a false alarm.

use super::decoder::decode_label_scores;
use super::hosted::InferenceClient;
use super::vocabulary::fire_signal;
use super::SegmentCategory;
use crate::core_types::ImageSample;
use crate::error::StrategyError;
use async_trait::async_trait;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which source produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// HSV colour-band pixel classification
    ColorHeuristic,
    /// Hosted fire/smoke image classifier
    HostedClassifier,
    /// Fire/smoke classes reported by the segmentation model
    Segmentation,
}

/// Fire/smoke evidence for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireDetection {
    pub fire_detected: bool,
    pub smoke_detected: bool,
    /// 0-1
    pub fire_probability: f32,
    /// 0-1
    pub smoke_probability: f32,
    /// Trust in this detection, 0-1
    pub confidence: f32,
    /// Fraction of pixels classified as flame (colour heuristic only)
    pub fire_coverage: f32,
    /// Fraction of pixels classified as smoke (colour heuristic only)
    pub smoke_coverage: f32,
    pub source: DetectionSource,
}

impl FireDetection {
    /// Negative detection with the given confidence
    pub fn none(source: DetectionSource, confidence: f32) -> Self {
        Self {
            fire_detected: false,
            smoke_detected: false,
            fire_probability: 0.0,
            smoke_probability: 0.0,
            confidence,
            fire_coverage: 0.0,
            smoke_coverage: 0.0,
            source,
        }
    }

    /// Combine two detections
    ///
    /// The higher-confidence detection wins the probabilities; the boolean
    /// flags are OR'd so either source can raise the alarm.
    #[must_use]
    pub fn merge(self, other: FireDetection) -> FireDetection {
        let (winner, loser) = if other.confidence > self.confidence {
            (other, self)
        } else {
            (self, other)
        };
        FireDetection {
            fire_detected: winner.fire_detected || loser.fire_detected,
            smoke_detected: winner.smoke_detected || loser.smoke_detected,
            fire_coverage: winner.fire_coverage.max(loser.fire_coverage),
            smoke_coverage: winner.smoke_coverage.max(loser.smoke_coverage),
            ..winner
        }
    }
}

/// Convert an RGB pixel to (hue degrees, saturation 0-1, value 0-1)
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if (max - r).abs() <= f32::EPSILON {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if (max - g).abs() <= f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (hue, saturation, max)
}

/// Colour-band thresholds for the pixel heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBands {
    /// Flame hue upper bound (degrees, red through orange)
    pub fire_hue_max: f32,
    /// Flame hue lower bound for the wrap-around red band
    pub fire_hue_wrap_min: f32,
    pub fire_min_saturation: f32,
    pub fire_min_value: f32,
    /// Fraction of flame pixels needed to report active fire
    pub fire_min_coverage: f32,
    /// Flame coverage that maps to probability 1.0
    pub fire_full_coverage: f32,
    pub smoke_max_saturation: f32,
    pub smoke_min_value: f32,
    pub smoke_max_value: f32,
    /// Fraction of grey pixels needed to report smoke
    pub smoke_min_coverage: f32,
}

impl Default for ColorBands {
    fn default() -> Self {
        Self {
            fire_hue_max: 35.0,
            fire_hue_wrap_min: 345.0,
            fire_min_saturation: 0.65,
            fire_min_value: 0.85,
            fire_min_coverage: 0.03,
            fire_full_coverage: 0.15,
            smoke_max_saturation: 0.12,
            smoke_min_value: 0.35,
            smoke_max_value: 0.85,
            smoke_min_coverage: 0.35,
        }
    }
}

/// Pixel-colour fire and smoke detector
///
/// Classifies every pixel; no sampling, so the result is exact and
/// deterministic for a given image.
#[derive(Debug, Clone, Default)]
pub struct ColorFireDetector {
    bands: ColorBands,
}

impl ColorFireDetector {
    const DETECTED_CONFIDENCE: f32 = 0.55;
    const CLEAR_CONFIDENCE: f32 = 0.5;

    pub fn new(bands: ColorBands) -> Self {
        Self { bands }
    }

    fn is_fire_pixel(&self, hue: f32, saturation: f32, value: f32) -> bool {
        (hue <= self.bands.fire_hue_max || hue >= self.bands.fire_hue_wrap_min)
            && saturation >= self.bands.fire_min_saturation
            && value >= self.bands.fire_min_value
    }

    fn is_smoke_pixel(&self, saturation: f32, value: f32) -> bool {
        saturation <= self.bands.smoke_max_saturation
            && (self.bands.smoke_min_value..=self.bands.smoke_max_value).contains(&value)
    }

    /// Classify all pixels of an image
    pub fn detect(&self, image: &ImageSample) -> FireDetection {
        let total = image.pixel_count();
        if total == 0 {
            return FireDetection::none(DetectionSource::ColorHeuristic, Self::CLEAR_CONFIDENCE);
        }

        let (fire_pixels, smoke_pixels) = image
            .pixels()
            .par_chunks_exact(3)
            .map(|p| {
                let (h, s, v) = rgb_to_hsv([p[0], p[1], p[2]]);
                (
                    u32::from(self.is_fire_pixel(h, s, v)),
                    u32::from(self.is_smoke_pixel(s, v)),
                )
            })
            .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

        let fire_coverage = fire_pixels as f32 / total as f32;
        let smoke_coverage = smoke_pixels as f32 / total as f32;

        let fire_detected = fire_coverage >= self.bands.fire_min_coverage;
        let smoke_detected = smoke_coverage >= self.bands.smoke_min_coverage;
        let fire_probability = (fire_coverage / self.bands.fire_full_coverage).clamp(0.0, 1.0);
        let smoke_probability = ((smoke_coverage - 0.1) / 0.5).clamp(0.0, 1.0);

        FireDetection {
            fire_detected,
            smoke_detected,
            fire_probability,
            smoke_probability,
            confidence: if fire_detected || smoke_detected {
                Self::DETECTED_CONFIDENCE
            } else {
                Self::CLEAR_CONFIDENCE
            },
            fire_coverage,
            smoke_coverage,
            source: DetectionSource::ColorHeuristic,
        }
    }
}

/// Optional hosted fire/smoke classifier
#[async_trait]
pub trait FireClassifier: Send + Sync {
    /// Model identifier reported by the health check
    fn model_id(&self) -> &str;

    /// Classify an image
    async fn classify(&self, image: &ImageSample) -> Result<FireDetection, StrategyError>;
}

/// Fire classifier backed by a hosted image-classification endpoint
pub struct HostedFireClassifier {
    model_id: String,
    client: Arc<InferenceClient>,
}

impl HostedFireClassifier {
    /// Label score at which the classifier is taken as a positive
    const POSITIVE_SCORE: f32 = 0.5;

    pub fn new(model_id: impl Into<String>, client: Arc<InferenceClient>) -> Self {
        Self {
            model_id: model_id.into(),
            client,
        }
    }
}

/// Turn classifier labels into a detection
pub(crate) fn detection_from_labels(labels: &[(String, f32)]) -> FireDetection {
    let mut fire_probability: f32 = 0.0;
    let mut smoke_probability: f32 = 0.0;
    let mut confidence: f32 = 0.0;

    for (label, score) in labels {
        let score = score.clamp(0.0, 1.0);
        confidence = confidence.max(score);
        match fire_signal(label) {
            Some(SegmentCategory::Fire) => fire_probability = fire_probability.max(score),
            Some(SegmentCategory::Smoke) => smoke_probability = smoke_probability.max(score),
            _ => {}
        }
    }

    FireDetection {
        fire_detected: fire_probability >= HostedFireClassifier::POSITIVE_SCORE,
        smoke_detected: smoke_probability >= HostedFireClassifier::POSITIVE_SCORE,
        fire_probability,
        smoke_probability,
        confidence,
        fire_coverage: 0.0,
        smoke_coverage: 0.0,
        source: DetectionSource::HostedClassifier,
    }
}

#[async_trait]
impl FireClassifier for HostedFireClassifier {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn classify(&self, image: &ImageSample) -> Result<FireDetection, StrategyError> {
        let body = self.client.infer(&self.model_id, image.encoded()).await?;
        let labels = decode_label_scores(&body)?
            .into_iter()
            .map(|entry| (entry.label, entry.score.unwrap_or(0.0)))
            .collect::<Vec<_>>();
        Ok(detection_from_labels(&labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(fire_rows: u32, rows: u32, fire: [u8; 3], rest: [u8; 3]) -> ImageSample {
        let width = 10;
        let mut pixels = Vec::new();
        for y in 0..rows {
            let colour = if y < fire_rows { fire } else { rest };
            for _ in 0..width {
                pixels.extend_from_slice(&colour);
            }
        }
        ImageSample::from_rgb(width, rows, pixels).unwrap()
    }

    #[test]
    fn test_hsv_conversion() {
        let (h, s, v) = rgb_to_hsv([255, 0, 0]);
        assert!(h.abs() < 1e-3 && (s - 1.0).abs() < 1e-6 && (v - 1.0).abs() < 1e-6);
        let (h, _, _) = rgb_to_hsv([0, 255, 0]);
        assert!((h - 120.0).abs() < 1e-3);
        let (_, s, v) = rgb_to_hsv([128, 128, 128]);
        assert!(s.abs() < 1e-6 && (v - 0.502).abs() < 0.01);
    }

    #[test]
    fn test_flames_detected() {
        // 20% of rows bright orange
        let image = striped(2, 10, [255, 120, 10], [40, 90, 30]);
        let detection = ColorFireDetector::default().detect(&image);
        assert!(detection.fire_detected);
        assert!((detection.fire_coverage - 0.2).abs() < 1e-6);
        assert!((detection.fire_probability - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_green_forest_is_clear() {
        let image = ImageSample::solid(10, 10, [34, 110, 40]).unwrap();
        let detection = ColorFireDetector::default().detect(&image);
        assert!(!detection.fire_detected);
        assert!(!detection.smoke_detected);
        assert_eq!(detection.fire_probability, 0.0);
    }

    #[test]
    fn test_dry_golden_grass_is_not_flame() {
        let image = ImageSample::solid(10, 10, [210, 180, 100]).unwrap();
        assert!(!ColorFireDetector::default().detect(&image).fire_detected);
    }

    #[test]
    fn test_grey_smoke_detected() {
        let image = striped(6, 10, [150, 150, 155], [40, 90, 30]);
        let detection = ColorFireDetector::default().detect(&image);
        assert!(detection.smoke_detected);
        assert!(!detection.fire_detected);
        assert!(detection.smoke_probability > 0.9);
    }

    #[test]
    fn test_merge_ors_flags_and_keeps_confident_probabilities() {
        let color = FireDetection {
            fire_detected: true,
            fire_probability: 0.3,
            ..FireDetection::none(DetectionSource::ColorHeuristic, 0.55)
        };
        let hosted = FireDetection {
            fire_probability: 0.1,
            ..FireDetection::none(DetectionSource::HostedClassifier, 0.9)
        };
        let merged = color.merge(hosted);
        assert!(merged.fire_detected);
        assert_eq!(merged.source, DetectionSource::HostedClassifier);
        assert!((merged.fire_probability - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_classifier_labels() {
        let labels = vec![
            ("wildfire".to_string(), 0.82),
            ("smoke".to_string(), 0.12),
            ("no_fire".to_string(), 0.06),
        ];
        let detection = detection_from_labels(&labels);
        assert!(detection.fire_detected);
        assert!(!detection.smoke_detected);
        assert!((detection.confidence - 0.82).abs() < 1e-6);

        let negative = detection_from_labels(&[("no_fire".to_string(), 0.97)]);
        assert!(!negative.fire_detected);
        assert_eq!(negative.fire_probability, 0.0);
    }

    #[test]
    fn test_classifier_ignores_fire_named_objects() {
        let labels = vec![
            ("fire engine, fire truck".to_string(), 0.91),
            ("fire screen, fireguard".to_string(), 0.05),
            ("fireplace".to_string(), 0.04),
        ];
        let detection = detection_from_labels(&labels);
        assert!(!detection.fire_detected);
        assert_eq!(detection.fire_probability, 0.0);
        assert!((detection.confidence - 0.91).abs() < 1e-6);
    }
}
