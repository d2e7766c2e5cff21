//! Simultaneous operations (SIMOPS) conflict detection.
//!
//! Location matching is a case-insensitive substring test in either
//! direction. It is a coarse proxy: zone or geofence identifiers would
//! replace it in a deployment that has them.

use serde::{Deserialize, Serialize};

use sitesafe_core::PermitId;

use crate::payload::TimeWindow;
use crate::permit::Permit;
use crate::stage::WorkflowStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    Spatial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub permit_id: PermitId,
    pub kind: ConflictKind,
    pub description: String,
}

/// Active permits that share a location with the candidate and overlap its window.
///
/// Permits not in `ACTIVE`, or without a recorded location and window, never conflict.
pub fn find_conflicts<'a>(
    candidate_location: &str,
    candidate_window: &TimeWindow,
    permits: impl IntoIterator<Item = &'a Permit>,
) -> Vec<Conflict> {
    permits
        .into_iter()
        .filter(|p| p.stage() == WorkflowStage::Active)
        .filter(|p| {
            p.location()
                .is_some_and(|loc| locations_overlap(candidate_location, loc))
        })
        .filter(|p| {
            p.coverage()
                .is_some_and(|window| candidate_window.overlaps(&window))
        })
        .map(|p| Conflict {
            permit_id: p.id_typed(),
            kind: ConflictKind::Spatial,
            description: format!(
                "Conflict with active permit #{} ({}) in same location.",
                p.permit_no().unwrap_or_default(),
                p.permit_type().map(|t| t.label()).unwrap_or("Unknown"),
            ),
        })
        .collect()
}

fn locations_overlap(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}
