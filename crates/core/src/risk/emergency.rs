//! Emergency override
//!
//! The calculator is a two-state machine: NORMAL scores the weighted
//! composite, EMERGENCY additionally enforces a floor so that visible fire or
//! smoke can never be outweighed by benign weather.

use crate::core_types::clamp_score;
use crate::features::FeatureSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fuel or dryness fraction above which conditions count as extreme
pub const EXTREME_FRACTION: f32 = 0.95;

/// Why an emergency was raised, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyType {
    ActiveFire,
    Smoke,
    ExtremeFuel,
    ExtremeDryness,
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmergencyType::ActiveFire => "active fire",
            EmergencyType::Smoke => "smoke",
            EmergencyType::ExtremeFuel => "extreme fuel load",
            EmergencyType::ExtremeDryness => "extreme dryness",
        };
        f.write_str(name)
    }
}

/// Calculator state for one assessment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmergencyState {
    Normal,
    Emergency {
        kind: EmergencyType,
        /// Minimum composite score while this emergency holds
        floor: f32,
    },
}

impl EmergencyState {
    /// Classify a feature set
    pub fn evaluate(features: &FeatureSet) -> Self {
        let indicators = features.fire_indicators();
        let fuel = features.fuel_load.fraction();
        let dryness = features.dryness_index.fraction();

        if indicators.active_fire {
            let p = probability(indicators.fire_probability);
            return EmergencyState::Emergency {
                kind: EmergencyType::ActiveFire,
                floor: 95.0 + 5.0 * p,
            };
        }
        if indicators.smoke_present {
            let p = probability(indicators.smoke_probability);
            return EmergencyState::Emergency {
                kind: EmergencyType::Smoke,
                floor: 80.0 + 5.0 * p,
            };
        }
        if fuel > EXTREME_FRACTION || dryness > EXTREME_FRACTION {
            let kind = if fuel >= dryness {
                EmergencyType::ExtremeFuel
            } else {
                EmergencyType::ExtremeDryness
            };
            let excess = fuel.max(dryness) - EXTREME_FRACTION;
            return EmergencyState::Emergency {
                kind,
                floor: 75.0 + 100.0 * excess,
            };
        }
        EmergencyState::Normal
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, EmergencyState::Emergency { .. })
    }

    pub fn kind(&self) -> Option<EmergencyType> {
        match self {
            EmergencyState::Normal => None,
            EmergencyState::Emergency { kind, .. } => Some(*kind),
        }
    }

    /// Apply the floor to a composite score
    pub fn apply(&self, composite: f32) -> f32 {
        match self {
            EmergencyState::Normal => clamp_score(composite),
            EmergencyState::Emergency { floor, .. } => clamp_score(composite.max(*floor)),
        }
    }
}

fn probability(p: f32) -> f32 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
