use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sitesafe_core::{OrgId, ProjectId, UserId};

use crate::roles::RoleKey;

/// A materialized user record as supplied by the persistence collaborator.
///
/// A user holds exactly one role at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub org_id: OrgId,
    pub role: RoleKey,
    #[serde(default)]
    pub project_ids: BTreeSet<ProjectId>,
}

impl User {
    pub fn new(id: UserId, org_id: OrgId, role: RoleKey) -> Self {
        Self {
            id,
            org_id,
            role,
            project_ids: BTreeSet::new(),
        }
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_ids.insert(project_id);
        self
    }

    pub fn is_member_of(&self, project_id: ProjectId) -> bool {
        self.project_ids.contains(&project_id)
    }
}
