use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Verb a rule can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Approve,
    Reject,
    Close,
    Export,
    Assign,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Approve,
        Action::Reject,
        Action::Close,
        Action::Export,
        Action::Assign,
    ];
}

/// Domain noun a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Dashboard,
    Reports,
    Inspections,
    Ptw,
    Rams,
    Training,
    People,
    Settings,
    Organizations,
    Projects,
    Roles,
    Plans,
    Checklists,
    Signage,
    Tbt,
    Housekeeping,
    Actions,
    SiteMap,
    Certification,
    HseStatistics,
    AiInsights,
}

impl Resource {
    pub const ALL: [Resource; 21] = [
        Resource::Dashboard,
        Resource::Reports,
        Resource::Inspections,
        Resource::Ptw,
        Resource::Rams,
        Resource::Training,
        Resource::People,
        Resource::Settings,
        Resource::Organizations,
        Resource::Projects,
        Resource::Roles,
        Resource::Plans,
        Resource::Checklists,
        Resource::Signage,
        Resource::Tbt,
        Resource::Housekeeping,
        Resource::Actions,
        Resource::SiteMap,
        Resource::Certification,
        Resource::HseStatistics,
        Resource::AiInsights,
    ];
}

/// Breadth of records a granted permission covers.
///
/// Ordered from narrowest to broadest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "own")]
    Own,
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "organization", alias = "org")]
    Organization,
}

/// Grant of a set of actions on one resource, at a scope, optionally gated by a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub resource: Resource,
    pub actions: Vec<Action>,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl PermissionRule {
    pub fn new(resource: Resource, actions: &[Action], scope: Scope) -> Self {
        Self {
            resource,
            actions: actions.to_vec(),
            scope,
            condition: None,
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn matches(&self, resource: Resource, action: Action) -> bool {
        self.resource == resource && self.actions.contains(&action)
    }
}
