//! Fixed rule tables for risk factors, recommendations and emergency actions

use super::emergency::EmergencyType;
use super::RiskCategory;
use crate::features::FeatureSet;
use crate::weather::{FireDangerRating, FireWeatherData, WarningLevel};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Severity of one contributing factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSeverity {
    Moderate,
    High,
    Critical,
}

/// One explained contribution to the assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub severity: FactorSeverity,
    /// Score of the underlying feature or component, 0-100
    pub score: f32,
    pub description: String,
}

impl RiskFactor {
    fn new(
        name: &str,
        severity: FactorSeverity,
        score: f32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            severity,
            score,
            description: description.into(),
        }
    }
}

/// Factor names shared between the factor and recommendation tables
pub mod factor {
    pub const ACTIVE_FIRE: &str = "active_fire";
    pub const SMOKE: &str = "smoke";
    pub const FUEL_LOAD: &str = "fuel_load";
    pub const LADDER_FUELS: &str = "ladder_fuels";
    pub const CROWN_DENSITY: &str = "crown_density";
    pub const FUEL_CONTINUITY: &str = "fuel_continuity";
    pub const STRUCTURE_EXPOSURE: &str = "structure_exposure";
    pub const DRYNESS: &str = "dryness";
    pub const FIRE_WEATHER: &str = "fire_weather";
    pub const RED_FLAG: &str = "red_flag";
}

/// High or moderate factor once a score crosses the matching threshold
fn graded(
    name: &str,
    score: f32,
    high_at: f32,
    moderate_at: f32,
    high: &str,
    moderate: &str,
) -> Option<RiskFactor> {
    if score >= high_at {
        Some(RiskFactor::new(name, FactorSeverity::High, score, high))
    } else if score >= moderate_at {
        Some(RiskFactor::new(name, FactorSeverity::Moderate, score, moderate))
    } else {
        None
    }
}

/// Build the factor list, most severe first
pub fn risk_factors(
    features: &FeatureSet,
    weather: Option<&FireWeatherData>,
    environmental: f32,
) -> Vec<RiskFactor> {
    let indicators = features.fire_indicators();
    let mut factors = Vec::new();

    if indicators.active_fire {
        factors.push(RiskFactor::new(
            factor::ACTIVE_FIRE,
            FactorSeverity::Critical,
            indicators.fire_probability * 100.0,
            "Active fire detected in the image",
        ));
    }
    if indicators.smoke_present {
        factors.push(RiskFactor::new(
            factor::SMOKE,
            FactorSeverity::Critical,
            indicators.smoke_probability * 100.0,
            "Smoke detected in the image",
        ));
    }

    factors.extend(
        [
            graded(
                factor::FUEL_LOAD,
                features.fuel_load.score,
                70.0,
                50.0,
                "Heavy vegetation fuel load",
                "Moderate vegetation fuel load",
            ),
            graded(
                factor::LADDER_FUELS,
                features.vertical_continuity.score,
                60.0,
                40.0,
                "Ladder fuels connect ground vegetation to the canopy",
                "Partial vertical fuel continuity",
            ),
            graded(
                factor::CROWN_DENSITY,
                features.crown_density.score,
                70.0,
                50.0,
                "Dense canopy can carry crown fire",
                "Moderately closed canopy",
            ),
            graded(
                factor::FUEL_CONTINUITY,
                features.fragmentation.score,
                60.0,
                40.0,
                "Continuous, well-connected fuel bed",
                "Partially connected fuel bed",
            ),
            graded(
                factor::STRUCTURE_EXPOSURE,
                features.proximity_to_structures.score,
                50.0,
                1.0,
                "Structures surrounded by flammable vegetation",
                "Structures near vegetation",
            ),
            graded(
                factor::DRYNESS,
                features.dryness_index.score,
                70.0,
                50.0,
                "Vegetation appears very dry",
                "Vegetation shows signs of drying",
            ),
        ]
        .into_iter()
        .flatten(),
    );

    if let Some(weather) = weather {
        let indices = &weather.fire_weather_indices;
        match indices.red_flag_warning.warning_level {
            WarningLevel::Critical => factors.push(RiskFactor::new(
                factor::RED_FLAG,
                FactorSeverity::Critical,
                environmental,
                format!(
                    "Critical red flag conditions: {}",
                    indices.red_flag_warning.reasons.join(", ")
                ),
            )),
            WarningLevel::Warning => factors.push(RiskFactor::new(
                factor::RED_FLAG,
                FactorSeverity::High,
                environmental,
                format!("Red flag conditions: {}", indices.red_flag_warning.reasons.join(", ")),
            )),
            WarningLevel::None => {}
        }
        if indices.fire_danger_rating >= FireDangerRating::High || environmental >= 70.0 {
            let severity = if indices.fire_danger_rating >= FireDangerRating::VeryHigh {
                FactorSeverity::High
            } else {
                FactorSeverity::Moderate
            };
            factors.push(RiskFactor::new(
                factor::FIRE_WEATHER,
                severity,
                environmental,
                format!(
                    "{} fire danger (FWI {:.1})",
                    indices.fire_danger_rating, indices.fwi
                ),
            ));
        }
    }

    factors.sort_by_key(|f| Reverse(f.severity));
    factors
}

fn recommendation_for(name: &str) -> Option<&'static str> {
    let text = match name {
        factor::ACTIVE_FIRE => "Leave the area and report the fire to emergency services",
        factor::SMOKE => "Report the smoke to your local fire authority and monitor conditions",
        factor::FUEL_LOAD => {
            "Reduce fuel: clear dead vegetation and keep grass mown short within 30 m of buildings"
        }
        factor::LADDER_FUELS => {
            "Remove ladder fuels: prune lower branches to 2 m and clear shrubs beneath trees"
        }
        factor::CROWN_DENSITY => "Thin the canopy to keep at least 3 m between tree crowns",
        factor::FUEL_CONTINUITY => {
            "Break up continuous fuel with firebreaks, paths or irrigated zones"
        }
        factor::STRUCTURE_EXPOSURE => {
            "Create defensible space: keep 10 m around structures free of flammable material"
        }
        factor::DRYNESS => "Water or remove cured vegetation and avoid outdoor burning",
        factor::RED_FLAG | factor::FIRE_WEATHER => {
            "Follow local fire weather warnings and avoid spark-producing activities"
        }
        _ => return None,
    };
    Some(text)
}

/// Recommendations for the factors present, deduplicated, in factor order
pub fn recommendations(factors: &[RiskFactor], category: RiskCategory) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for text in factors.iter().filter_map(|f| recommendation_for(&f.name)) {
        if !out.iter().any(|existing| existing == text) {
            out.push(text.to_string());
        }
    }

    match category {
        RiskCategory::Low if out.is_empty() => {
            out.push("Maintain current vegetation management and seasonal clean-up".to_string());
        }
        RiskCategory::Low | RiskCategory::Moderate => {}
        RiskCategory::High | RiskCategory::Extreme => {
            out.push(
                "Prepare a bushfire survival plan and keep emergency contacts at hand".to_string(),
            );
        }
    }
    out
}

/// Emergency actions; empty unless in emergency or at EXTREME category
pub fn emergency_actions(emergency: Option<EmergencyType>, composite: f32) -> Vec<String> {
    let actions: &[&str] = match emergency {
        Some(EmergencyType::ActiveFire) => &[
            "Call emergency services immediately",
            "Evacuate now if the fire is near or you are told to leave",
            "Do not attempt to fight a spreading fire",
        ],
        Some(EmergencyType::Smoke) => &[
            "Report the smoke to emergency services or the local fire authority",
            "Prepare to evacuate: pack essentials and confirm your route",
            "Close windows and doors and limit outdoor exposure to smoke",
        ],
        Some(EmergencyType::ExtremeFuel | EmergencyType::ExtremeDryness) | None
            if composite >= 75.0 || emergency.is_some() =>
        {
            &[
                "Review your evacuation plan and routes",
                "Prepare an emergency kit and keep it ready to go",
                "Register for local emergency alerts",
            ]
        }
        _ => &[],
    };
    actions.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, FireIndicators};

    fn features(fuel: f32, proximity: f32) -> FeatureSet {
        let mut set = FeatureSet::default();
        set.fuel_load = Feature::new(fuel, Default::default());
        set.proximity_to_structures = Feature::new(proximity, Default::default());
        set
    }

    #[test]
    fn test_factor_thresholds() {
        let factors = risk_factors(&features(75.0, 20.0), None, 30.0);
        assert_eq!(factors.len(), 2);
        assert_eq!(factors[0].name, factor::FUEL_LOAD);
        assert_eq!(factors[0].severity, FactorSeverity::High);
        assert_eq!(factors[1].severity, FactorSeverity::Moderate);
        assert!(risk_factors(&FeatureSet::default(), None, 30.0).is_empty());
    }

    #[test]
    fn test_fire_factor_comes_first() {
        let mut set = features(75.0, 0.0);
        set.dryness_index.raw_metrics.fire_indicators = FireIndicators {
            active_fire: true,
            fire_probability: 0.9,
            ..Default::default()
        };
        let factors = risk_factors(&set, None, 30.0);
        assert_eq!(factors[0].name, factor::ACTIVE_FIRE);
        assert_eq!(factors[0].severity, FactorSeverity::Critical);
    }

    #[test]
    fn test_recommendations_are_deduplicated() {
        let factors = vec![
            RiskFactor::new(factor::RED_FLAG, FactorSeverity::High, 80.0, ""),
            RiskFactor::new(factor::FIRE_WEATHER, FactorSeverity::High, 80.0, ""),
        ];
        let recs = recommendations(&factors, RiskCategory::Moderate);
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_low_risk_gets_maintenance_advice() {
        let recs = recommendations(&[], RiskCategory::Low);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].starts_with("Maintain"));
    }

    #[test]
    fn test_emergency_actions() {
        assert!(emergency_actions(None, 40.0).is_empty());
        assert_eq!(emergency_actions(None, 80.0).len(), 3);
        let fire = emergency_actions(Some(EmergencyType::ActiveFire), 99.0);
        assert!(fire[0].contains("emergency services"));
        assert_eq!(emergency_actions(Some(EmergencyType::ExtremeDryness), 60.0).len(), 3);
    }
}
