//! Composite risk scoring
//!
//! ```text
//! base          = 0.25 fuel + 0.20 continuity + 0.20 dryness
//!               + 0.15 proximity + 0.10 fragmentation
//! environmental = weather components x seasonal multiplier (30 without weather)
//! composite     = 0.7 base + 0.3 environmental
//!                 x1.2 if environmental > 80
//!                 x1.3 more if base > 80 and environmental > 60
//! ```
//!
//! An emergency (fire, smoke, extreme fuel or dryness) raises the composite
//! to a floor; it never lowers it.

pub mod emergency;
pub mod environmental;
pub mod rules;

pub use emergency::{EmergencyState, EmergencyType, EXTREME_FRACTION};
pub use environmental::{
    environmental_risk, seasonal_multiplier, EnvironmentalBreakdown, FireSeasonRegion,
};
pub use rules::{FactorSeverity, RiskFactor};

use crate::core_types::{clamp_score, clamp_unit, AnalysisContext};
use crate::features::FeatureSet;
use crate::segmentation::{
    fire_signal, has_risk_keywords, SegmentCategory, SegmentationModel,
};
use crate::weather::{DataSource, FireWeatherData};
use crate::PIPELINE_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Base-risk weights; the remaining 0.10 is reserved
pub mod weights {
    pub const FUEL_LOAD: f32 = 0.25;
    pub const CONTINUITY: f32 = 0.20;
    pub const DRYNESS: f32 = 0.20;
    pub const PROXIMITY: f32 = 0.15;
    pub const FRAGMENTATION: f32 = 0.10;

    /// Share of the composite taken by the base score
    pub const BASE_SHARE: f32 = 0.7;
    /// Share of the composite taken by environmental risk
    pub const ENVIRONMENTAL_SHARE: f32 = 0.3;
}

/// Risk category ranges over the composite score
pub mod category_ranges {
    use std::ops::{Range, RangeFrom};

    pub const LOW: Range<f32> = 0.0..25.0;
    pub const MODERATE: Range<f32> = 25.0..50.0;
    pub const HIGH: Range<f32> = 50.0..75.0;
    pub const EXTREME: RangeFrom<f32> = 75.0..;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskCategory {
    pub fn from_score(score: f32) -> Self {
        let score = clamp_score(score);
        match score {
            _ if category_ranges::EXTREME.contains(&score) => RiskCategory::Extreme,
            _ if category_ranges::HIGH.contains(&score) => RiskCategory::High,
            _ if category_ranges::MODERATE.contains(&score) => RiskCategory::Moderate,
            _ => RiskCategory::Low,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Moderate => "MODERATE",
            RiskCategory::High => "HIGH",
            RiskCategory::Extreme => "EXTREME",
        };
        f.write_str(name)
    }
}

/// How much real data went into an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    /// Filename keywords only
    Minimal,
    /// Heuristic segmentation or non-live weather
    Degraded,
    /// Hosted segmentation and live weather (or no location requested)
    Full,
}

/// Provenance and degradation details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentMetadata {
    pub pipeline_version: String,
    pub data_quality: DataQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Final output of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub base_risk_score: f32,
    pub environmental_risk: f32,
    pub composite_risk_score: f32,
    pub risk_category: RiskCategory,
    /// 0-1
    pub confidence_level: f32,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
    pub emergency_actions: Vec<String>,
    pub emergency_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_type: Option<EmergencyType>,
    pub metadata: AssessmentMetadata,
}

/// Weighted base risk from the feature scores
pub fn base_risk(features: &FeatureSet) -> f32 {
    clamp_score(
        weights::FUEL_LOAD * clamp_score(features.fuel_load.score)
            + weights::CONTINUITY * clamp_score(features.vertical_continuity.score)
            + weights::DRYNESS * clamp_score(features.dryness_index.score)
            + weights::PROXIMITY * clamp_score(features.proximity_to_structures.score)
            + weights::FRAGMENTATION * clamp_score(features.fragmentation.score),
    )
}

/// Normal-state composite with the synergy multipliers
pub fn composite_score(base: f32, environmental: f32) -> f32 {
    let mut composite = weights::BASE_SHARE * base + weights::ENVIRONMENTAL_SHARE * environmental;
    if environmental > 80.0 {
        composite *= 1.2;
    }
    if base > 80.0 && environmental > 60.0 {
        composite *= 1.3;
    }
    clamp_score(composite)
}

/// Turns features and weather into a [`RiskAssessment`]
#[derive(Debug, Clone, Default)]
pub struct RiskCalculator;

impl RiskCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_risk(
        &self,
        features: &FeatureSet,
        weather: Option<&FireWeatherData>,
        context: &AnalysisContext,
    ) -> RiskAssessment {
        let base = base_risk(features);
        let environmental = environmental_risk(weather, context.location, context.month());
        let state = EmergencyState::evaluate(features);

        let normal = composite_score(base, environmental.total);
        let composite = state.apply(normal);
        let category = RiskCategory::from_score(composite);

        if let EmergencyState::Emergency { kind, floor } = state {
            warn!(
                "Emergency override: {} (floor {:.1}, composite {:.1})",
                kind, floor, composite
            );
        }
        debug!(
            "Risk: base {:.1}, environmental {:.1} (x{:.2}), composite {:.1} -> {}",
            base, environmental.total, environmental.seasonal_multiplier, composite, category
        );

        let risk_factors = rules::risk_factors(features, weather, environmental.total);
        let recommendations = rules::recommendations(&risk_factors, category);
        let emergency_actions = rules::emergency_actions(state.kind(), composite);

        RiskAssessment {
            base_risk_score: base,
            environmental_risk: environmental.total,
            composite_risk_score: composite,
            risk_category: category,
            confidence_level: confidence_level(features, weather, context),
            risk_factors,
            recommendations,
            emergency_actions,
            emergency_detected: state.is_emergency(),
            emergency_type: state.kind(),
            metadata: AssessmentMetadata {
                pipeline_version: PIPELINE_VERSION.to_string(),
                data_quality: data_quality(features, weather, context),
                fallback_reason: None,
            },
        }
    }

    /// Minimal assessment from filename keywords alone
    ///
    /// Used when no segmentation result exists at all.
    pub fn keyword_estimate(&self, context: &AnalysisContext) -> RiskAssessment {
        let hint = context.hint_text();
        let (score, description) = match fire_signal(&hint) {
            Some(SegmentCategory::Fire) => (80.0, "Description mentions fire"),
            Some(SegmentCategory::Smoke) => (70.0, "Description mentions smoke"),
            _ if has_risk_keywords(context) => {
                (55.0, "Description mentions dry or hazardous vegetation")
            }
            _ => (35.0, "No image analysis available"),
        };
        let category = RiskCategory::from_score(score);

        let factor = RiskFactor {
            name: "keyword_estimate".to_string(),
            severity: if score >= 70.0 {
                FactorSeverity::High
            } else {
                FactorSeverity::Moderate
            },
            score,
            description: description.to_string(),
        };

        let mut recommendations = vec![
            "Image analysis was unavailable; upload a clearer photo for a full assessment"
                .to_string(),
        ];
        recommendations.extend(rules::recommendations(&[], category));

        RiskAssessment {
            base_risk_score: score,
            environmental_risk: 0.0,
            composite_risk_score: score,
            risk_category: category,
            confidence_level: 0.1,
            risk_factors: vec![factor],
            recommendations,
            emergency_actions: rules::emergency_actions(None, score),
            emergency_detected: false,
            emergency_type: None,
            metadata: AssessmentMetadata {
                pipeline_version: PIPELINE_VERSION.to_string(),
                data_quality: DataQuality::Minimal,
                fallback_reason: None,
            },
        }
    }
}

/// Trust in the inputs: 70% segmentation, 30% weather
fn confidence_level(
    features: &FeatureSet,
    weather: Option<&FireWeatherData>,
    context: &AnalysisContext,
) -> f32 {
    let segmentation = if features.metadata.segmentation_model.is_some() {
        clamp_unit(features.metadata.segmentation_confidence)
    } else {
        0.3
    };
    let weather = match weather {
        Some(w) if w.is_real_time => 1.0,
        Some(w) if w.data_source == DataSource::ForecastFallback => 0.7,
        Some(_) => 0.4,
        None if context.location.is_none() => 0.6,
        None => 0.4,
    };
    clamp_unit(0.7 * segmentation + 0.3 * weather)
}

fn data_quality(
    features: &FeatureSet,
    weather: Option<&FireWeatherData>,
    context: &AnalysisContext,
) -> DataQuality {
    let hosted = matches!(
        features.metadata.segmentation_model,
        Some(
            SegmentationModel::Primary
                | SegmentationModel::Secondary
                | SegmentationModel::Tertiary
        )
    );
    let weather_ok = match weather {
        Some(w) => w.is_real_time,
        None => context.location.is_none(),
    };
    if hosted && weather_ok {
        DataQuality::Full
    } else {
        DataQuality::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, FeatureMetadata, FireIndicators};

    fn features(fuel: f32, dryness: f32) -> FeatureSet {
        let mut set = FeatureSet::default();
        set.fuel_load = Feature::new(fuel, Default::default());
        set.dryness_index.score = dryness;
        set.metadata = FeatureMetadata {
            segmentation_model: Some(SegmentationModel::Primary),
            segmentation_confidence: 0.9,
        };
        set
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(RiskCategory::from_score(24.99), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(25.0), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_score(50.0), RiskCategory::High);
        assert_eq!(RiskCategory::from_score(75.0), RiskCategory::Extreme);
        assert_eq!(RiskCategory::from_score(f32::NAN), RiskCategory::Low);
    }

    #[test]
    fn test_base_risk_weights() {
        let mut set = FeatureSet::default();
        set.fuel_load.score = 100.0;
        set.vertical_continuity.score = 100.0;
        set.dryness_index.score = 100.0;
        set.proximity_to_structures.score = 100.0;
        set.fragmentation.score = 100.0;
        set.crown_density.score = 100.0;
        assert!((base_risk(&set) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_nan_features_count_as_zero() {
        let mut set = FeatureSet::default();
        set.fuel_load.score = f32::NAN;
        set.dryness_index.score = f32::NAN;
        assert_eq!(base_risk(&set), 0.0);
        let assessment = RiskCalculator.calculate_risk(&set, None, &AnalysisContext::new());
        assert!(assessment.composite_risk_score.is_finite());
    }

    #[test]
    fn test_synergy_multipliers() {
        assert!((composite_score(50.0, 50.0) - 50.0).abs() < 1e-4);
        assert!((composite_score(50.0, 90.0) - 62.0 * 1.2).abs() < 1e-3);
        assert!((composite_score(82.0, 65.0) - 76.9 * 1.3).abs() < 1e-3);
        assert_eq!(composite_score(90.0, 90.0), 100.0);
    }

    #[test]
    fn test_low_scenario_without_weather() {
        let assessment =
            RiskCalculator.calculate_risk(&features(20.0, 10.0), None, &AnalysisContext::new());
        assert_eq!(assessment.risk_category, RiskCategory::Low);
        assert!(assessment.composite_risk_score < 25.0);
        assert!(!assessment.emergency_detected);
        assert!(assessment.emergency_actions.is_empty());
        assert_eq!(assessment.metadata.data_quality, DataQuality::Full);
    }

    #[test]
    fn test_active_fire_forces_extreme() {
        let mut set = features(10.0, 100.0);
        set.dryness_index.raw_metrics.fire_indicators = FireIndicators {
            active_fire: true,
            fire_probability: 0.8,
            ..Default::default()
        };
        let assessment = RiskCalculator.calculate_risk(&set, None, &AnalysisContext::new());
        assert!(assessment.composite_risk_score >= 95.0);
        assert_eq!(assessment.risk_category, RiskCategory::Extreme);
        assert_eq!(assessment.emergency_type, Some(EmergencyType::ActiveFire));
        assert!(!assessment.emergency_actions.is_empty());
    }

    #[test]
    fn test_composite_monotone_in_fuel_and_dryness() {
        let calculator = RiskCalculator::new();
        let ctx = AnalysisContext::new();
        let mut previous = 0.0;
        for step in 0..=100 {
            let level = step as f32;
            let score = calculator
                .calculate_risk(&features(level, level), None, &ctx)
                .composite_risk_score;
            assert!(score >= previous, "dropped at {level}");
            previous = score;
        }
    }

    #[test]
    fn test_keyword_estimate() {
        let calculator = RiskCalculator::new();
        let estimate = |name: &str| {
            calculator.keyword_estimate(&AnalysisContext::new().with_filename(name))
        };

        let fire = estimate("wildfire_ridge.jpg");
        assert_eq!(fire.risk_category, RiskCategory::Extreme);
        assert_eq!(fire.metadata.data_quality, DataQuality::Minimal);

        let plain = estimate("IMG_0001.jpg");
        assert_eq!(plain.risk_category, RiskCategory::Moderate);
        assert!(!plain.emergency_detected);

        let indoors = estimate("fireplace_and_hearth.jpg");
        assert!((indoors.composite_risk_score - 35.0).abs() < 1e-6);
    }
}
