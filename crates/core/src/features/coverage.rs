//! Per-category coverage from segmentation regions

use crate::core_types::clamp_unit;
use crate::segmentation::{Region, SegmentCategory, SegmentationResult};

/// Coverage assumed for a region that reports neither coverage nor area
pub const FALLBACK_REGION_COVERAGE: f32 = 0.1;

/// Coverage contributed by one region
fn region_coverage(region: &Region, total_pixels: u32) -> f32 {
    let raw = match (region.coverage, region.area) {
        (Some(coverage), _) => coverage,
        (None, Some(area)) if total_pixels > 0 => area as f32 / total_pixels as f32,
        _ => FALLBACK_REGION_COVERAGE,
    };
    if raw.is_nan() || raw < 0.0 {
        0.0
    } else {
        raw
    }
}

/// Summed coverage of a region list, clamped to `[0, 1]`
pub fn coverage_of(regions: &[Region], total_pixels: u32) -> f32 {
    clamp_unit(
        regions
            .iter()
            .map(|r| region_coverage(r, total_pixels))
            .sum(),
    )
}

/// Coverage of each vegetation class plus structures
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoverageBreakdown {
    pub trees: f32,
    pub grass: f32,
    pub shrubs: f32,
    pub structures: f32,
    /// Number of vegetation regions (trees, grass, shrubs)
    pub vegetation_patches: usize,
}

impl CoverageBreakdown {
    pub fn from_segmentation(segmentation: &SegmentationResult) -> Self {
        let total = segmentation.total_pixels;
        let of = |category| coverage_of(segmentation.regions_of(category), total);
        let vegetation_patches = [
            SegmentCategory::Trees,
            SegmentCategory::Grass,
            SegmentCategory::Shrubs,
        ]
        .iter()
        .map(|&c| segmentation.regions_of(c).len())
        .sum();

        Self {
            trees: of(SegmentCategory::Trees),
            grass: of(SegmentCategory::Grass),
            shrubs: of(SegmentCategory::Shrubs),
            structures: of(SegmentCategory::Structures),
            vegetation_patches,
        }
    }

    /// Combined vegetation coverage, clamped to `[0, 1]`
    pub fn vegetation(&self) -> f32 {
        clamp_unit(self.trees + self.grass + self.shrubs)
    }
}
