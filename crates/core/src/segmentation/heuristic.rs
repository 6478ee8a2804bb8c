//! Last-resort segmentation with fixed coverage ratios
//!
//! Performs no I/O and cannot fail. The only input it looks at is the
//! filename/description, which nudges the ratios toward denser fuel when it
//! mentions dry or burnt conditions.

use super::strategy::{SegmentationStrategy, StrategyOutcome};
use super::vocabulary::{fire_signal, mentions_any};
use super::{Region, RegionMap, SegmentCategory, SegmentationModel};
use crate::core_types::{AnalysisContext, ImageSample};
use crate::error::StrategyError;
use async_trait::async_trait;

/// Filename words that suggest elevated hazard, alongside any fire or smoke mention
pub const RISK_KEYWORDS: &[&str] = &[
    "dry", "burn", "burnt", "burned", "drought", "dead", "brush", "scorch", "scorched", "parched",
    "tinder",
];

/// Coverage ratios assumed for an unremarkable scene
const BASELINE: [(SegmentCategory, f32); 4] = [
    (SegmentCategory::Trees, 0.25),
    (SegmentCategory::Grass, 0.30),
    (SegmentCategory::Shrubs, 0.20),
    (SegmentCategory::Structures, 0.05),
];

/// Coverage ratios when the hint mentions risk keywords
const ELEVATED: [(SegmentCategory, f32); 4] = [
    (SegmentCategory::Trees, 0.30),
    (SegmentCategory::Grass, 0.40),
    (SegmentCategory::Shrubs, 0.30),
    (SegmentCategory::Structures, 0.05),
];

/// True when the context hint contains any risk keyword
pub fn has_risk_keywords(context: &AnalysisContext) -> bool {
    let hint = context.hint_text();
    fire_signal(&hint).is_some() || mentions_any(&hint, RISK_KEYWORDS)
}

/// Terminal strategy with fixed, plausible coverage
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSegmentation;

impl HeuristicSegmentation {
    /// Reported confidence; low on purpose so downstream quality reflects it
    pub const CONFIDENCE: f32 = 0.3;

    /// Build the region map for a context
    pub fn regions_for(context: &AnalysisContext) -> RegionMap {
        let table = if has_risk_keywords(context) {
            &ELEVATED
        } else {
            &BASELINE
        };
        table
            .iter()
            .map(|&(category, coverage)| {
                (
                    category,
                    vec![Region {
                        label: format!("{category} (estimated)"),
                        confidence: Self::CONFIDENCE,
                        coverage: Some(coverage),
                        area: None,
                    }],
                )
            })
            .collect()
    }
}

#[async_trait]
impl SegmentationStrategy for HeuristicSegmentation {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn model(&self) -> SegmentationModel {
        SegmentationModel::Heuristic
    }

    fn is_terminal(&self) -> bool {
        true
    }

    async fn segment(
        &self,
        _image: &ImageSample,
        context: &AnalysisContext,
    ) -> Result<StrategyOutcome, StrategyError> {
        Ok(StrategyOutcome {
            regions: Self::regions_for(context),
            confidence: Self::CONFIDENCE,
        })
    }
}
