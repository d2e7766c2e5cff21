//! Permit application content.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use sitesafe_core::{DomainError, DomainResult, PermitType};

/// Coverage window of the work, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// True when either endpoint of `self` falls inside `other`, or `self` encloses `other`.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        other.contains(self.start) || other.contains(self.end) || self.contains(other.start)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDetails {
    pub location: String,
    pub description: String,
    pub coverage: TimeWindow,
    #[serde(default)]
    pub number_of_workers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementResponse {
    Yes,
    No,
    #[serde(rename = "N/A")]
    NotApplicable,
}

/// One line of the safety requirements checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRequirement {
    pub text: String,
    pub response: RequirementResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireWatch {
    pub watcher: String,
    pub post_watch_minutes: u32,
}

/// A single atmospheric test before or during confined-space entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasTestReading {
    pub taken_at: DateTime<Utc>,
    pub oxygen_percent: f64,
    pub lel_percent: f64,
    pub h2s_ppm: f64,
    #[serde(default)]
    pub co_ppm: f64,
    pub tester: String,
}

impl GasTestReading {
    pub const OXYGEN_MIN: f64 = 19.5;
    pub const OXYGEN_MAX: f64 = 23.5;
    pub const LEL_MAX: f64 = 10.0;
    pub const H2S_MAX: f64 = 10.0;

    pub fn is_safe(&self) -> bool {
        (Self::OXYGEN_MIN..=Self::OXYGEN_MAX).contains(&self.oxygen_percent)
            && self.lel_percent <= Self::LEL_MAX
            && self.h2s_ppm <= Self::H2S_MAX
    }
}

/// Lift plan figures, all in tonnes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCalculation {
    pub load_weight: f64,
    #[serde(default)]
    pub rigging_weight: f64,
    pub crane_capacity: f64,
}

impl LoadCalculation {
    /// Total lifted weight as a percentage of crane capacity. `None` for a zero capacity.
    pub fn utilization_percent(&self) -> Option<f64> {
        if self.crane_capacity <= 0.0 {
            return None;
        }
        Some((self.load_weight + self.rigging_weight) / self.crane_capacity * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectricalIsolation {
    pub voltage_level: String,
    pub loto_procedure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcavationDetails {
    pub soil_type: String,
    pub cave_in_protection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpecificSection {
    None,
    FireWatch(FireWatch),
    GasTests { readings: Vec<GasTestReading> },
    LoadCalculation(LoadCalculation),
    ElectricalIsolation(ElectricalIsolation),
    Excavation(ExcavationDetails),
}

impl TypeSpecificSection {
    /// Whether this section may be attached to a permit of `permit_type`.
    fn fits(&self, permit_type: PermitType) -> bool {
        match self {
            TypeSpecificSection::None => true,
            TypeSpecificSection::FireWatch(_) => permit_type == PermitType::HotWork,
            TypeSpecificSection::GasTests { .. } => permit_type == PermitType::ConfinedSpaceEntry,
            TypeSpecificSection::LoadCalculation(_) => permit_type == PermitType::Lifting,
            TypeSpecificSection::ElectricalIsolation(_) => {
                permit_type == PermitType::ElectricalWork
            }
            TypeSpecificSection::Excavation(_) => permit_type == PermitType::Excavation,
        }
    }
}

/// Everything the requester fills in on the permit application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitPayload {
    pub permit_no: String,
    pub work: WorkDetails,
    #[serde(default)]
    pub safety_requirements: Vec<SafetyRequirement>,
    pub section: TypeSpecificSection,
}

impl PermitPayload {
    pub fn new(permit_no: impl Into<String>, work: WorkDetails) -> Self {
        Self {
            permit_no: permit_no.into(),
            work,
            safety_requirements: Vec::new(),
            section: TypeSpecificSection::None,
        }
    }

    pub fn with_requirement(mut self, text: impl Into<String>, response: RequirementResponse) -> Self {
        self.safety_requirements.push(SafetyRequirement {
            text: text.into(),
            response,
        });
        self
    }

    pub fn with_section(mut self, section: TypeSpecificSection) -> Self {
        self.section = section;
        self
    }

    /// Check the payload against the rules for `permit_type`.
    pub fn validate(&self, permit_type: PermitType) -> DomainResult<()> {
        if self.work.location.trim().is_empty() {
            return Err(DomainError::validation("work location is required"));
        }

        let coverage = self.work.coverage;
        if coverage.end < coverage.start {
            return Err(DomainError::validation("coverage end is before its start"));
        }

        let max_hours = permit_type.details().max_duration_hours;
        if coverage.duration() > Duration::hours(i64::from(max_hours)) {
            return Err(DomainError::validation(format!(
                "{permit_type} permits cover at most {max_hours} hours"
            )));
        }

        if !self.section.fits(permit_type) {
            return Err(DomainError::validation(format!(
                "type-specific section does not apply to {permit_type}"
            )));
        }

        Ok(())
    }
}
