use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use sitesafe_core::{OrgId, PermitType, ProjectId, UserId};

/// The record an action targets, reduced to the attributes authorization reads.
///
/// Every field is optional; evaluation treats an absent field as "unknown",
/// never as a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectData {
    pub creator_id: Option<UserId>,
    pub reporter_id: Option<UserId>,
    pub payload_creator_id: Option<UserId>,
    pub org_id: Option<OrgId>,
    pub project_id: Option<ProjectId>,
    pub permit_type: Option<PermitType>,
}

impl SubjectData {
    /// Read the subject attributes out of an arbitrary JSON record.
    ///
    /// Recognized keys: `creator_id`, `reporter_id`, `payload.creator_id`,
    /// `org_id`, `project_id`, `type`. Unparseable values are dropped.
    pub fn from_json(record: &JsonValue) -> Self {
        fn parse<T: FromStr>(v: Option<&JsonValue>) -> Option<T> {
            v.and_then(JsonValue::as_str).and_then(|s| s.parse().ok())
        }

        Self {
            creator_id: parse(record.get("creator_id")),
            reporter_id: parse(record.get("reporter_id")),
            payload_creator_id: parse(record.get("payload").and_then(|p| p.get("creator_id"))),
            org_id: parse(record.get("org_id")),
            project_id: parse(record.get("project_id")),
            permit_type: parse(record.get("type")),
        }
    }

    /// The first owner-identifying field present: creator, reporter, payload creator.
    pub fn owner_id(&self) -> Option<UserId> {
        self.creator_id
            .or(self.reporter_id)
            .or(self.payload_creator_id)
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id() == Some(user_id)
    }

    pub fn with_creator(mut self, user_id: UserId) -> Self {
        self.creator_id = Some(user_id);
        self
    }

    pub fn with_reporter(mut self, user_id: UserId) -> Self {
        self.reporter_id = Some(user_id);
        self
    }

    pub fn with_org(mut self, org_id: OrgId) -> Self {
        self.org_id = Some(org_id);
        self
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_permit_type(mut self, permit_type: PermitType) -> Self {
        self.permit_type = Some(permit_type);
        self
    }
}
