//! Dynamic risk scoring.
//!
//! The result is an annotation: it suggests controls but never gates a
//! transition on its own.

use serde::{Deserialize, Serialize};

use sitesafe_core::PermitType;

pub const MAX_SCORE: u32 = 100;

const DEFAULT_BASE: f64 = 10.0;
const DEFAULT_COMPLEXITY: f64 = 1.0;
const NIGHT_FACTOR: f64 = 1.4;

pub const SUGGEST_INDEPENDENT_VERIFICATION: &str = "Mandatory Independent Verification (IV) required.";
pub const SUGGEST_LIGHTING: &str = "Ensure auxiliary lighting towers are deployed.";
pub const SUGGEST_HEAT_STRESS: &str = "Implement heat stress management plan (15/45 cycle).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weather {
    Clear,
    Rain,
    Windy,
    Hot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s > 75 => RiskTier::Critical,
            s if s > 50 => RiskTier::High,
            s if s > 25 => RiskTier::Medium,
            _ => RiskTier::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub base_score: f64,
    pub complexity_factor: f64,
    pub weather_factor: f64,
    pub time_factor: f64,
    /// Composite score, `0..=MAX_SCORE`.
    pub score: u32,
    pub tier: RiskTier,
    pub suggestions: Vec<String>,
}

/// Score a permit of a known type.
pub fn score(permit_type: PermitType, is_night_work: bool, weather: Weather) -> RiskAnalysis {
    compute(Some(permit_type), is_night_work, weather)
}

/// Score a permit from a free-text type label.
///
/// Unrecognized labels get the default base and complexity instead of failing.
pub fn score_label(type_label: &str, is_night_work: bool, weather: Weather) -> RiskAnalysis {
    compute(type_label.parse().ok(), is_night_work, weather)
}

fn base_and_complexity(permit_type: Option<PermitType>) -> (f64, f64) {
    match permit_type {
        Some(PermitType::HotWork) => (40.0, 1.5),
        Some(PermitType::ConfinedSpaceEntry) => (50.0, 2.0),
        Some(PermitType::Lifting) => (35.0, 1.8),
        Some(PermitType::ElectricalWork) => (45.0, 1.9),
        Some(PermitType::Excavation) => (30.0, 1.4),
        _ => (DEFAULT_BASE, DEFAULT_COMPLEXITY),
    }
}

fn weather_factor(permit_type: Option<PermitType>, weather: Weather) -> f64 {
    match (weather, permit_type) {
        (Weather::Windy, Some(PermitType::Lifting)) => 1.5,
        (Weather::Rain, Some(PermitType::ElectricalWork)) => 2.0,
        (Weather::Hot, _) => 1.2,
        _ => 1.0,
    }
}

fn compute(permit_type: Option<PermitType>, is_night_work: bool, weather: Weather) -> RiskAnalysis {
    let (base_score, complexity_factor) = base_and_complexity(permit_type);
    let weather_factor = weather_factor(permit_type, weather);
    let time_factor = if is_night_work { NIGHT_FACTOR } else { 1.0 };

    let raw = (base_score * complexity_factor * weather_factor * time_factor).round();
    let score = raw.clamp(0.0, f64::from(MAX_SCORE)) as u32;
    let tier = RiskTier::from_score(score);

    let mut suggestions = Vec::new();
    if tier == RiskTier::Critical {
        suggestions.push(SUGGEST_INDEPENDENT_VERIFICATION.to_string());
    }
    if is_night_work {
        suggestions.push(SUGGEST_LIGHTING.to_string());
    }
    if weather == Weather::Hot {
        suggestions.push(SUGGEST_HEAT_STRESS.to_string());
    }

    RiskAnalysis {
        base_score,
        complexity_factor,
        weather_factor,
        time_factor,
        score,
        tier,
        suggestions,
    }
}
