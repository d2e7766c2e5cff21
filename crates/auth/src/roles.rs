use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::permissions::{PermissionRule, Scope};

/// Role identity key (e.g. "HSE_MANAGER").
///
/// Keys are unique within a catalog and immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleKey(Cow<'static, str>);

impl RoleKey {
    pub const ADMIN: RoleKey = RoleKey::from_static("ADMIN");
    pub const ORG_ADMIN: RoleKey = RoleKey::from_static("ORG_ADMIN");
    pub const HSE_MANAGER: RoleKey = RoleKey::from_static("HSE_MANAGER");
    pub const SUPERVISOR: RoleKey = RoleKey::from_static("SUPERVISOR");
    pub const HSE_OFFICER: RoleKey = RoleKey::from_static("HSE_OFFICER");
    pub const INSPECTOR: RoleKey = RoleKey::from_static("INSPECTOR");
    pub const WORKER: RoleKey = RoleKey::from_static("WORKER");
    pub const CLIENT_VIEWER: RoleKey = RoleKey::from_static("CLIENT_VIEWER");
    pub const CUSTOM_SITE_LEAD: RoleKey = RoleKey::from_static("CUSTOM_SITE_LEAD");
    pub const GUEST: RoleKey = RoleKey::from_static("GUEST");

    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RoleKey {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

/// A role in the catalog: label, default visibility, own rules, optional parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub key: RoleKey,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<RoleKey>,
    pub default_scope: Scope,
    #[serde(default)]
    pub permissions: Vec<PermissionRule>,
}

impl RoleDefinition {
    pub fn new(key: RoleKey, label: impl Into<String>, default_scope: Scope) -> Self {
        Self {
            key,
            label: label.into(),
            inherits_from: None,
            default_scope,
            permissions: Vec::new(),
        }
    }

    pub fn inherits(mut self, parent: RoleKey) -> Self {
        self.inherits_from = Some(parent);
        self
    }

    pub fn rule(mut self, rule: PermissionRule) -> Self {
        self.permissions.push(rule);
        self
    }
}

/// Whether a role is considered competent to take part in permit work.
///
/// Certificate lookups live outside this crate; only guests are excluded here.
pub fn verify_competency(role: &RoleKey) -> bool {
    role != &RoleKey::GUEST
}
