//! Permit type catalog.
//!
//! The set of permit types is closed; each type carries static metadata used
//! by payload validation, attribute conditions and risk scoring.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Kind of hazardous or regulated activity a permit governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermitType {
    #[serde(rename = "Hot Work")]
    HotWork,
    #[serde(rename = "Confined Space Entry")]
    ConfinedSpaceEntry,
    #[serde(rename = "Lifting")]
    Lifting,
    #[serde(rename = "Electrical Work")]
    ElectricalWork,
    #[serde(rename = "Work at Height")]
    WorkAtHeight,
    #[serde(rename = "Excavation")]
    Excavation,
    #[serde(rename = "Night Work")]
    NightWork,
    #[serde(rename = "Road Closure")]
    RoadClosure,
    #[serde(rename = "Utility Work")]
    UtilityWork,
    #[serde(rename = "General Work")]
    GeneralWork,
}

/// Broad grouping of permit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitCategory {
    General,
    Specialized,
    Hazardous,
}

/// Static metadata for a permit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermitTypeDetails {
    pub category: PermitCategory,
    pub max_duration_hours: u32,
    pub requires_risk_assessment: bool,
    pub requires_method_statement: bool,
    pub requires_loto: bool,
}

impl PermitType {
    pub const ALL: [PermitType; 10] = [
        PermitType::HotWork,
        PermitType::ConfinedSpaceEntry,
        PermitType::Lifting,
        PermitType::ElectricalWork,
        PermitType::WorkAtHeight,
        PermitType::Excavation,
        PermitType::NightWork,
        PermitType::RoadClosure,
        PermitType::UtilityWork,
        PermitType::GeneralWork,
    ];

    /// Types treated as inherently high-risk by attribute conditions.
    pub const HIGH_RISK: [PermitType; 4] = [
        PermitType::HotWork,
        PermitType::ConfinedSpaceEntry,
        PermitType::Lifting,
        PermitType::ElectricalWork,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PermitType::HotWork => "Hot Work",
            PermitType::ConfinedSpaceEntry => "Confined Space Entry",
            PermitType::Lifting => "Lifting",
            PermitType::ElectricalWork => "Electrical Work",
            PermitType::WorkAtHeight => "Work at Height",
            PermitType::Excavation => "Excavation",
            PermitType::NightWork => "Night Work",
            PermitType::RoadClosure => "Road Closure",
            PermitType::UtilityWork => "Utility Work",
            PermitType::GeneralWork => "General Work",
        }
    }

    pub fn is_high_risk(self) -> bool {
        Self::HIGH_RISK.contains(&self)
    }

    pub fn details(self) -> PermitTypeDetails {
        use PermitCategory::*;

        let (category, max_duration_hours, requires_loto) = match self {
            PermitType::HotWork => (Hazardous, 8, true),
            PermitType::ConfinedSpaceEntry => (Hazardous, 8, true),
            PermitType::Lifting => (Hazardous, 12, false),
            PermitType::ElectricalWork => (Hazardous, 12, true),
            PermitType::WorkAtHeight => (Hazardous, 12, false),
            PermitType::Excavation => (Hazardous, 24, true),
            PermitType::NightWork => (Specialized, 12, true),
            PermitType::RoadClosure => (Specialized, 24, false),
            PermitType::UtilityWork => (General, 24, true),
            PermitType::GeneralWork => (General, 24, true),
        };

        PermitTypeDetails {
            category,
            max_duration_hours,
            requires_risk_assessment: true,
            requires_method_statement: true,
            requires_loto,
        }
    }
}

impl core::fmt::Display for PermitType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PermitType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PermitType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| DomainError::validation(format!("unknown permit type '{s}'")))
    }
}
