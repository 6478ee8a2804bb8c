//! Feature extraction
//!
//! Turns one [`SegmentationResult`] plus the source image into a fixed set of
//! six 0-100 hazard features. Everything except the dryness colour sample is a
//! pure function of the region coverage.

pub mod coverage;
pub mod curves;
pub mod dryness;

pub use coverage::{coverage_of, CoverageBreakdown, FALLBACK_REGION_COVERAGE};
pub use curves::fuel_load_to_risk;
pub use dryness::{dryness_metrics, ColorSample, DrynessMetrics, FireIndicators, MAX_SAMPLED_PIXELS};

use crate::core_types::{clamp_score, ImageSample};
use crate::segmentation::{SegmentationModel, SegmentationResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One scored feature with the metrics that produced it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature<M> {
    /// 0-100
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub raw_metrics: M,
}

impl<M> Feature<M> {
    pub fn new(score: f32, raw_metrics: M) -> Self {
        Self {
            score: clamp_score(score),
            raw_metrics,
        }
    }

    /// Score as a 0-1 fraction; NaN reads as 0
    pub fn fraction(&self) -> f32 {
        clamp_score(self.score) / 100.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelLoadMetrics {
    pub grass_coverage: f32,
    pub shrub_coverage: f32,
    pub tree_coverage: f32,
    pub weighted_load: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuityMetrics {
    pub grass_shrub_overlap: f32,
    pub shrub_tree_overlap: f32,
    pub ladder_factor: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrownMetrics {
    pub tree_coverage: f32,
    pub canopy_closure: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentationMetrics {
    pub patch_count: usize,
    pub total_coverage: f32,
    pub fragmentation: f32,
    pub connectivity: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityMetrics {
    pub structures_present: bool,
    pub structure_coverage: f32,
    pub vegetation_coverage: f32,
}

/// Where the features came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureMetadata {
    pub segmentation_model: Option<SegmentationModel>,
    pub segmentation_confidence: f32,
}

/// The six hazard features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    pub fuel_load: Feature<FuelLoadMetrics>,
    pub vertical_continuity: Feature<ContinuityMetrics>,
    pub crown_density: Feature<CrownMetrics>,
    pub fragmentation: Feature<FragmentationMetrics>,
    pub proximity_to_structures: Feature<ProximityMetrics>,
    pub dryness_index: Feature<DrynessMetrics>,
    pub metadata: FeatureMetadata,
}

impl FeatureSet {
    pub fn fire_indicators(&self) -> FireIndicators {
        self.dryness_index.raw_metrics.fire_indicators
    }
}

/// Extract features from a segmentation result and its image
pub fn extract(segmentation: &SegmentationResult, image: &ImageSample) -> FeatureSet {
    let coverage = CoverageBreakdown::from_segmentation(segmentation);
    let vegetation = coverage.vegetation();

    let weighted_load = curves::weighted_fuel_load(&coverage);
    let fuel_load = Feature::new(
        curves::fuel_load_to_risk(weighted_load),
        FuelLoadMetrics {
            grass_coverage: coverage.grass,
            shrub_coverage: coverage.shrubs,
            tree_coverage: coverage.trees,
            weighted_load,
        },
    );

    let (grass_shrub_overlap, shrub_tree_overlap) = curves::layer_overlap(&coverage);
    let vertical_continuity = Feature::new(
        curves::continuity_score(&coverage),
        ContinuityMetrics {
            grass_shrub_overlap,
            shrub_tree_overlap,
            ladder_factor: curves::ladder_factor(&coverage),
        },
    );

    let canopy_closure = curves::canopy_closure(coverage.trees);
    let crown_density = Feature::new(
        canopy_closure * 100.0,
        CrownMetrics {
            tree_coverage: coverage.trees,
            canopy_closure,
        },
    );

    let (fragmentation, connectivity, fragmentation_score) =
        curves::fragmentation(coverage.vegetation_patches, vegetation);
    let fragmentation = Feature::new(
        fragmentation_score,
        FragmentationMetrics {
            patch_count: coverage.vegetation_patches,
            total_coverage: vegetation,
            fragmentation,
            connectivity,
        },
    );

    let proximity_to_structures = Feature::new(
        curves::proximity_score(vegetation, coverage.structures),
        ProximityMetrics {
            structures_present: coverage.structures > 0.01,
            structure_coverage: coverage.structures,
            vegetation_coverage: vegetation,
        },
    );

    let sample = ColorSample::from_image(image);
    let dryness = dryness_metrics(&sample, FireIndicators::from(&segmentation.fire));
    let dryness_index = Feature::new(dryness.dryness * 100.0, dryness);

    debug!(
        "Features: fuel {:.1}, continuity {:.1}, crown {:.1}, fragmentation {:.1}, \
         proximity {:.1}, dryness {:.1}",
        fuel_load.score,
        vertical_continuity.score,
        crown_density.score,
        fragmentation.score,
        proximity_to_structures.score,
        dryness_index.score
    );

    FeatureSet {
        fuel_load,
        vertical_continuity,
        crown_density,
        fragmentation,
        proximity_to_structures,
        dryness_index,
        metadata: FeatureMetadata {
            segmentation_model: Some(segmentation.model),
            segmentation_confidence: segmentation.confidence,
        },
    }
}
