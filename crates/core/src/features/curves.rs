//! Scoring curves mapping coverage metrics onto 0-100 feature scores
//!
//! The breakpoints are policy constants and must not drift; downstream risk
//! categories were tuned against them.

use super::coverage::CoverageBreakdown;
use crate::core_types::{clamp_score, clamp_unit};

/// Fuel-load weights per vegetation class
pub const GRASS_FUEL_WEIGHT: f32 = 0.5;
pub const SHRUB_FUEL_WEIGHT: f32 = 0.75;
pub const TREE_FUEL_WEIGHT: f32 = 1.0;

/// Tree coverage treated as a fully closed canopy
pub const CLOSED_CANOPY_COVERAGE: f32 = 0.7;

/// Weighted fuel load (0 upward; 1.0 is "fully loaded")
pub fn weighted_fuel_load(coverage: &CoverageBreakdown) -> f32 {
    coverage.grass * GRASS_FUEL_WEIGHT
        + coverage.shrubs * SHRUB_FUEL_WEIGHT
        + coverage.trees * TREE_FUEL_WEIGHT
}

/// Piecewise-linear fuel-load curve
///
/// - `[0, 0.5]` maps to `[0, 30]`
/// - `(0.5, 0.8]` maps to `(30, 70]`
/// - `(0.8, 1.0]` maps to `(70, 100]`, capped at 100 above 1.0
pub fn fuel_load_to_risk(load: f32) -> f32 {
    let load = if load.is_nan() { 0.0 } else { load.max(0.0) };
    let score = if load <= 0.5 {
        load / 0.5 * 30.0
    } else if load <= 0.8 {
        30.0 + (load - 0.5) / 0.3 * 40.0
    } else {
        70.0 + (load - 0.8) / 0.2 * 30.0
    };
    clamp_score(score)
}

/// Ladder-fuel factor from the three vegetation layers
pub fn ladder_factor(coverage: &CoverageBreakdown) -> f32 {
    let (g, s, t) = (coverage.grass, coverage.shrubs, coverage.trees);
    if g > 0.3 && s > 0.3 && t > 0.3 {
        1.0
    } else if (g > 0.2 && s > 0.2) || (s > 0.2 && t > 0.2) {
        0.7
    } else {
        0.3
    }
}

/// Mean overlap of adjacent layers (grass/shrubs, shrubs/trees)
pub fn layer_overlap(coverage: &CoverageBreakdown) -> (f32, f32) {
    (
        coverage.grass.min(coverage.shrubs),
        coverage.shrubs.min(coverage.trees),
    )
}

/// Vertical fuel continuity score
pub fn continuity_score(coverage: &CoverageBreakdown) -> f32 {
    let (lower, upper) = layer_overlap(coverage);
    let mean_pair = (lower + upper) / 2.0;
    clamp_score(100.0 * (2.0 * mean_pair).min(1.0) * ladder_factor(coverage))
}

/// Canopy closure relative to a closed canopy, 0-1
pub fn canopy_closure(tree_coverage: f32) -> f32 {
    clamp_unit(tree_coverage / CLOSED_CANOPY_COVERAGE)
}

/// Patch fragmentation and connectivity
///
/// Returns `(fragmentation, connectivity, score)`.
pub fn fragmentation(patches: usize, total_coverage: f32) -> (f32, f32, f32) {
    let fragmentation = patches as f32 / total_coverage.max(0.01);
    let connectivity = 1.0 / (1.0 + fragmentation / 10.0);
    let score = total_coverage * connectivity * 80.0 + patches.min(10) as f32 * 2.0;
    (fragmentation, connectivity, clamp_score(score))
}

/// Structure exposure to surrounding vegetation
pub fn proximity_score(vegetation: f32, structures: f32) -> f32 {
    if structures <= 0.01 {
        return 0.0;
    }
    let exposure = 0.3 + 0.7 * clamp_unit(vegetation);
    let presence = (0.5 + structures * 5.0).min(1.0);
    clamp_score(100.0 * exposure * presence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cov(trees: f32, grass: f32, shrubs: f32) -> CoverageBreakdown {
        CoverageBreakdown {
            trees,
            grass,
            shrubs,
            ..Default::default()
        }
    }

    #[test]
    fn test_fuel_curve_endpoints_and_breakpoints() {
        assert_relative_eq!(fuel_load_to_risk(0.0), 0.0);
        assert_relative_eq!(fuel_load_to_risk(0.5), 30.0);
        assert_relative_eq!(fuel_load_to_risk(0.8), 70.0, epsilon = 1e-4);
        assert_relative_eq!(fuel_load_to_risk(1.0), 100.0, epsilon = 1e-4);
        assert_relative_eq!(fuel_load_to_risk(2.5), 100.0);
        assert_relative_eq!(fuel_load_to_risk(f32::NAN), 0.0);
    }

    #[test]
    fn test_fuel_curve_is_monotone_and_continuous() {
        let mut previous = fuel_load_to_risk(0.0);
        for step in 1..=1200 {
            let load = step as f32 / 1000.0;
            let score = fuel_load_to_risk(load);
            assert!(score >= previous, "curve dropped at load {load}");
            assert!(score - previous < 0.2, "jump at load {load}");
            previous = score;
        }
    }

    #[test]
    fn test_ladder_factor_tiers() {
        assert_eq!(ladder_factor(&cov(0.35, 0.35, 0.35)), 1.0);
        assert_eq!(ladder_factor(&cov(0.0, 0.25, 0.25)), 0.7);
        assert_eq!(ladder_factor(&cov(0.25, 0.0, 0.25)), 0.7);
        // trees and grass are not adjacent layers
        assert_eq!(ladder_factor(&cov(0.25, 0.25, 0.0)), 0.3);
    }

    #[test]
    fn test_continuity_score() {
        // pairs 0.35/0.35 -> mean 0.35 -> min(1, 0.7) * ladder 1.0
        assert_relative_eq!(continuity_score(&cov(0.35, 0.35, 0.35)), 70.0, epsilon = 1e-4);
        assert_eq!(continuity_score(&cov(0.6, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_fragmentation_score_is_additive() {
        let (frag, conn, score) = fragmentation(2, 0.5);
        assert_relative_eq!(frag, 4.0);
        assert_relative_eq!(conn, 1.0 / 1.4, epsilon = 1e-6);
        assert_relative_eq!(score, 0.5 / 1.4 * 80.0 + 4.0, epsilon = 1e-4);
        assert_eq!(fragmentation(0, 0.0).2, 0.0);
    }

    #[test]
    fn test_proximity() {
        assert_eq!(proximity_score(0.9, 0.0), 0.0);
        assert_eq!(proximity_score(0.9, 0.01), 0.0);
        assert_relative_eq!(proximity_score(1.0, 0.2), 100.0);
        assert!(proximity_score(0.2, 0.05) < proximity_score(0.8, 0.05));
    }
}
