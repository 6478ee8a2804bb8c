//! Decoders for hosted model responses
//!
//! Two response shapes are understood:
//! - mask lists: `[{label, score, mask}]` where `mask` is a base64 PNG
//! - label lists: `[{label, score}]` from plain classifiers
//!
//! An object body with an `error` field (model loading, quota) is treated as a
//! malformed response so the chain moves on.

use super::vocabulary::categorize;
use super::{Region, RegionMap};
use crate::core_types::clamp_unit;
use crate::error::StrategyError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;

/// Score assumed for labels returned without one
const DEFAULT_LABEL_SCORE: f32 = 0.75;

/// Mask pixels brighter than this count as "inside" the region
const MASK_THRESHOLD: u8 = 127;

/// One entry of a hosted model response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub mask: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Which response layout a model produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Segmentation masks with labels
    MaskList,
    /// Classifier labels with scores only
    LabelList,
}

/// Decoded response: mapped regions and the response confidence
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRegions {
    pub regions: RegionMap,
    /// Mean score of the mapped labels; 0 when nothing mapped
    pub confidence: f32,
}

/// Parse the `[{label, score, mask?}]` array common to both shapes
pub fn decode_label_scores(body: &Value) -> Result<Vec<LabelScore>, StrategyError> {
    if let Ok(err) = ErrorBody::deserialize(body) {
        return Err(StrategyError::Malformed(format!("upstream error: {}", err.error)));
    }
    Vec::<LabelScore>::deserialize(body).map_err(|e| StrategyError::Malformed(e.to_string()))
}

/// Fraction of "on" pixels in a base64-encoded mask image
pub fn mask_coverage(encoded: &str) -> Result<f32, StrategyError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| StrategyError::Malformed(format!("mask is not base64: {e}")))?;
    let mask = image::load_from_memory(&bytes)
        .map_err(|e| StrategyError::Malformed(format!("mask is not an image: {e}")))?
        .to_luma8();

    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return Ok(0.0);
    }
    let on = mask.as_raw().iter().filter(|&&p| p > MASK_THRESHOLD).count();
    Ok(on as f32 / total as f32)
}

/// Decode a response body into categorised regions
pub fn decode_regions(body: &Value, shape: ResponseShape) -> Result<DecodedRegions, StrategyError> {
    let entries = decode_label_scores(body)?;

    let mut regions = RegionMap::new();
    let mut score_sum = 0.0;
    let mut mapped = 0usize;

    for entry in entries {
        let Some(category) = categorize(&entry.label) else {
            continue;
        };
        let score = clamp_unit(entry.score.unwrap_or(DEFAULT_LABEL_SCORE));
        let coverage = match (shape, entry.mask.as_deref()) {
            (ResponseShape::MaskList, Some(mask)) => Some(mask_coverage(mask)?),
            _ => None,
        };

        score_sum += score;
        mapped += 1;
        regions.entry(category).or_default().push(Region {
            label: entry.label,
            confidence: score,
            coverage,
            area: None,
        });
    }

    let confidence = if mapped == 0 {
        0.0
    } else {
        score_sum / mapped as f32
    };
    Ok(DecodedRegions { regions, confidence })
}
