//! `sitesafe-auth` — role registry and permission evaluation (RBAC + attribute conditions).
//!
//! This crate is a pure decision layer: it never performs IO. Callers hand it
//! materialized user and subject records and get back allow/deny decisions.

pub mod authorize;
pub mod catalog;
pub mod condition;
pub mod permissions;
pub mod registry;
pub mod roles;
pub mod subject;
pub mod user;

pub use authorize::{
    AuthorizationExplanation, DenialKind, check, effective_scope, explain,
};
pub use catalog::default_catalog;
pub use condition::Condition;
pub use permissions::{Action, PermissionRule, Resource, Scope};
pub use registry::{
    DEFAULT_MAX_ROLE_DEPTH, RegistryError, RegistryHandle, RoleCatalog, RoleRegistry,
};
pub use roles::{RoleDefinition, RoleKey, verify_competency};
pub use subject::SubjectData;
pub use user::User;
