//! Permission evaluation.
//!
//! A decision is an OR across every effective rule that names the requested
//! resource and action: permissions are additive and there is no deny rule.
//! A matching rule grants when its scope check and its condition both pass.
//!
//! - No IO
//! - No panics
//! - Denial is a value, never an error

use serde::Serialize;
use tracing::debug;

use crate::permissions::{Action, PermissionRule, Resource, Scope};
use crate::registry::RoleRegistry;
use crate::subject::SubjectData;
use crate::user::User;

/// Why a check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoPrincipal,
    UnknownRole,
    NoMatchingRule,
    OrganizationMismatch,
    ProjectMismatch,
    MissingSubject,
    OwnershipMismatch,
    ConditionFailed,
}

/// Detailed, auditable explanation of a permission decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: Action,
    pub resource: Resource,
    pub granted: bool,
    pub reason: String,
    pub role: Option<String>,
    /// `[role, parent, ..., root]` for the user's role.
    pub role_chain: Vec<String>,
    pub matched_rules: usize,
    /// Scope of the rule that granted access.
    pub granted_scope: Option<Scope>,
    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    SuperRole,
    Granted { scope: Scope, matched: usize },
    Denied { kind: DenialKind, matched: usize },
}

/// Is `user` allowed to perform `action` on `resource` (optionally a specific record)?
pub fn check(
    registry: &RoleRegistry,
    user: Option<&User>,
    action: Action,
    resource: Resource,
    subject: Option<&SubjectData>,
) -> bool {
    match evaluate(registry, user, action, resource, subject) {
        Verdict::SuperRole | Verdict::Granted { .. } => true,
        Verdict::Denied { kind, matched } => {
            debug!(
                user = ?user.map(|u| u.id),
                role = ?user.map(|u| u.role.as_str()),
                ?action,
                ?resource,
                ?kind,
                matched,
                "permission denied"
            );
            false
        }
    }
}

/// Scope of the first effective rule granting `action` on `resource`.
///
/// Used by listing screens to decide which records to show. The super-role
/// always gets the broadest scope. `None` means no rule grants the action.
pub fn effective_scope(
    registry: &RoleRegistry,
    user: Option<&User>,
    resource: Resource,
    action: Action,
) -> Option<Scope> {
    let user = user?;
    if registry.is_super_role(&user.role) {
        return Some(Scope::Organization);
    }
    registry
        .resolve_effective_rules(&user.role)
        .ok()?
        .iter()
        .find(|r| r.matches(resource, action))
        .map(|r| r.scope)
}

/// Same decision as [`check`], with the reasoning spelled out.
pub fn explain(
    registry: &RoleRegistry,
    user: Option<&User>,
    action: Action,
    resource: Resource,
    subject: Option<&SubjectData>,
) -> AuthorizationExplanation {
    let verdict = evaluate(registry, user, action, resource, subject);

    let role = user.map(|u| u.role.to_string());
    let role_chain = user
        .and_then(|u| registry.inheritance_chain(&u.role).ok())
        .map(|chain| chain.iter().map(ToString::to_string).collect())
        .unwrap_or_default();

    let (granted, reason, matched_rules, granted_scope, denial) = match verdict {
        Verdict::SuperRole => (
            true,
            format!("role '{}' is the super-role", registry.super_role()),
            0,
            Some(Scope::Organization),
            None,
        ),
        Verdict::Granted { scope, matched } => (
            true,
            format!("granted by a {scope:?}-scoped rule on {resource:?}"),
            matched,
            Some(scope),
            None,
        ),
        Verdict::Denied { kind, matched } => (
            false,
            denial_reason(kind, action, resource),
            matched,
            None,
            Some(kind),
        ),
    };

    AuthorizationExplanation {
        action,
        resource,
        granted,
        reason,
        role,
        role_chain,
        matched_rules,
        granted_scope,
        denial,
    }
}

fn denial_reason(kind: DenialKind, action: Action, resource: Resource) -> String {
    match kind {
        DenialKind::NoPrincipal => "no authenticated user".to_string(),
        DenialKind::UnknownRole => "user's role is not defined in the role registry".to_string(),
        DenialKind::NoMatchingRule => {
            format!("no rule grants {action:?} on {resource:?}")
        }
        DenialKind::OrganizationMismatch => {
            "record belongs to a different organization".to_string()
        }
        DenialKind::ProjectMismatch => "user is not a member of the record's project".to_string(),
        DenialKind::MissingSubject => {
            "own-scoped rule requires the specific record to check ownership".to_string()
        }
        DenialKind::OwnershipMismatch => "user is not the owner of the record".to_string(),
        DenialKind::ConditionFailed => "rule condition did not hold for this record".to_string(),
    }
}

fn evaluate(
    registry: &RoleRegistry,
    user: Option<&User>,
    action: Action,
    resource: Resource,
    subject: Option<&SubjectData>,
) -> Verdict {
    let Some(user) = user else {
        return Verdict::Denied {
            kind: DenialKind::NoPrincipal,
            matched: 0,
        };
    };

    if registry.is_super_role(&user.role) {
        return Verdict::SuperRole;
    }

    let rules = match registry.resolve_effective_rules(&user.role) {
        Ok(rules) => rules,
        Err(e) => {
            debug!(user = %user.id, error = %e, "user role not in registry");
            return Verdict::Denied {
                kind: DenialKind::UnknownRole,
                matched: 0,
            };
        }
    };

    let mut matched = 0;
    let mut first_failure = None;
    for rule in rules.iter().filter(|r| r.matches(resource, action)) {
        matched += 1;
        match rule_eligibility(rule, user, subject) {
            Ok(()) => {
                return Verdict::Granted {
                    scope: rule.scope,
                    matched,
                };
            }
            Err(kind) => {
                first_failure.get_or_insert(kind);
            }
        }
    }

    Verdict::Denied {
        kind: first_failure.unwrap_or(DenialKind::NoMatchingRule),
        matched,
    }
}

fn rule_eligibility(
    rule: &PermissionRule,
    user: &User,
    subject: Option<&SubjectData>,
) -> Result<(), DenialKind> {
    if let Some(org) = subject.and_then(|s| s.org_id) {
        if org != user.org_id {
            return Err(DenialKind::OrganizationMismatch);
        }
    }

    match rule.scope {
        Scope::Organization => {}
        Scope::Project => {
            if let Some(project) = subject.and_then(|s| s.project_id) {
                if !user.is_member_of(project) {
                    return Err(DenialKind::ProjectMismatch);
                }
            }
        }
        Scope::Own => {
            let subject = subject.ok_or(DenialKind::MissingSubject)?;
            if !subject.is_owned_by(user.id) {
                return Err(DenialKind::OwnershipMismatch);
            }
        }
    }

    match &rule.condition {
        Some(condition) if !condition.evaluate(user, subject) => Err(DenialKind::ConditionFailed),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::condition::Condition;
    use crate::registry::RoleCatalog;
    use crate::roles::{RoleDefinition, RoleKey};
    use proptest::prelude::*;
    use sitesafe_core::{OrgId, PermitType, ProjectId, UserId};

    fn registry() -> RoleRegistry {
        RoleRegistry::load(default_catalog()).unwrap()
    }

    fn user(role: RoleKey) -> User {
        User::new(UserId::new(), OrgId::new(), role)
    }

    #[test]
    fn absent_user_is_denied() {
        let r = registry();
        assert!(!check(&r, None, Action::Read, Resource::Dashboard, None));
        assert_eq!(
            explain(&r, None, Action::Read, Resource::Dashboard, None).denial,
            Some(DenialKind::NoPrincipal)
        );
    }

    #[test]
    fn super_role_bypasses_every_rule() {
        let r = registry();
        let admin = user(RoleKey::ADMIN);
        let foreign = SubjectData::default()
            .with_creator(UserId::new())
            .with_org(OrgId::new());

        // No rule anywhere grants ai-insights deletion.
        assert!(check(&r, Some(&admin), Action::Delete, Resource::AiInsights, None));
        assert!(check(&r, Some(&admin), Action::Approve, Resource::Ptw, Some(&foreign)));
        assert_eq!(
            effective_scope(&r, Some(&admin), Resource::Ptw, Action::Read),
            Some(Scope::Organization)
        );
    }

    #[test]
    fn unmatched_action_is_denied_by_default() {
        let r = registry();
        let viewer = user(RoleKey::CLIENT_VIEWER);
        assert!(check(&r, Some(&viewer), Action::Export, Resource::Reports, None));
        assert!(!check(&r, Some(&viewer), Action::Delete, Resource::Reports, None));

        let exp = explain(&r, Some(&viewer), Action::Delete, Resource::Reports, None);
        assert_eq!(exp.denial, Some(DenialKind::NoMatchingRule));
        assert_eq!(exp.matched_rules, 0);
    }

    #[test]
    fn own_scope_fails_closed_without_subject() {
        let r = registry();
        let worker = user(RoleKey::WORKER);
        assert!(!check(&r, Some(&worker), Action::Update, Resource::Ptw, None));
        assert_eq!(
            explain(&r, Some(&worker), Action::Update, Resource::Ptw, None).denial,
            Some(DenialKind::MissingSubject)
        );
    }

    #[test]
    fn own_scope_checks_recorded_owner() {
        let r = registry();
        let worker = user(RoleKey::WORKER);
        let mine = SubjectData::default().with_creator(worker.id);
        let reported_by_me = SubjectData::default().with_reporter(worker.id);
        let theirs = SubjectData::default().with_creator(UserId::new());

        assert!(check(&r, Some(&worker), Action::Update, Resource::Ptw, Some(&mine)));
        assert!(check(&r, Some(&worker), Action::Read, Resource::Reports, Some(&reported_by_me)));
        assert!(!check(&r, Some(&worker), Action::Update, Resource::Ptw, Some(&theirs)));
        assert_eq!(
            explain(&r, Some(&worker), Action::Update, Resource::Ptw, Some(&theirs)).denial,
            Some(DenialKind::OwnershipMismatch)
        );
    }

    #[test]
    fn foreign_organization_records_are_denied() {
        let r = registry();
        let manager = user(RoleKey::HSE_MANAGER);
        let foreign = SubjectData::default().with_org(OrgId::new());
        let local = SubjectData::default().with_org(manager.org_id);

        assert!(!check(&r, Some(&manager), Action::Read, Resource::Ptw, Some(&foreign)));
        assert!(check(&r, Some(&manager), Action::Read, Resource::Ptw, Some(&local)));
    }

    #[test]
    fn project_scope_requires_membership_when_record_names_a_project() {
        let r = registry();
        let project = ProjectId::new();
        let member = user(RoleKey::SUPERVISOR).with_project(project);
        let outsider = user(RoleKey::SUPERVISOR);
        let record = SubjectData::default().with_project(project);

        assert!(check(&r, Some(&member), Action::Update, Resource::Ptw, Some(&record)));
        assert!(!check(&r, Some(&outsider), Action::Update, Resource::Ptw, Some(&record)));
        // Listing context: no record yet.
        assert!(check(&r, Some(&outsider), Action::Read, Resource::Ptw, None));
    }

    #[test]
    fn conditions_gate_matching_rules() {
        let approver = RoleKey::from_static("ROUTINE_APPROVER");
        let routine_only = Condition::high_risk_permit().negate();
        let catalog = RoleCatalog {
            super_role: RoleKey::ADMIN,
            roles: vec![
                RoleDefinition::new(RoleKey::ADMIN, "Administrator", Scope::Organization),
                RoleDefinition::new(approver.clone(), "Routine Approver", Scope::Project)
                    .rule(
                        PermissionRule::new(Resource::Ptw, &[Action::Approve], Scope::Project)
                            .when(routine_only.clone()),
                    )
                    .rule(
                        PermissionRule::new(Resource::Ptw, &[Action::Close], Scope::Own)
                            .when(Condition::all([Condition::IsOwner, routine_only])),
                    ),
            ],
        };
        let r = RoleRegistry::load(catalog).unwrap();
        let project = ProjectId::new();
        let u = user(approver).with_project(project);
        let routine = SubjectData::default()
            .with_project(project)
            .with_permit_type(PermitType::Excavation);
        let hot = SubjectData::default()
            .with_project(project)
            .with_permit_type(PermitType::HotWork);

        assert!(check(&r, Some(&u), Action::Approve, Resource::Ptw, Some(&routine)));
        assert!(!check(&r, Some(&u), Action::Approve, Resource::Ptw, Some(&hot)));
        assert_eq!(
            explain(&r, Some(&u), Action::Approve, Resource::Ptw, Some(&hot)).denial,
            Some(DenialKind::ConditionFailed)
        );

        let my_routine = routine.clone().with_creator(u.id);
        let my_hot = hot.clone().with_creator(u.id);
        assert!(check(&r, Some(&u), Action::Close, Resource::Ptw, Some(&my_routine)));
        assert!(!check(&r, Some(&u), Action::Close, Resource::Ptw, Some(&my_hot)));
        assert!(!check(&r, Some(&u), Action::Close, Resource::Ptw, Some(&routine.with_creator(UserId::new()))));
    }

    #[test]
    fn builtin_catalog_leaves_approval_to_managers() {
        let r = registry();
        let project = ProjectId::new();
        let record = SubjectData::default()
            .with_project(project)
            .with_permit_type(PermitType::Excavation);
        let officer = user(RoleKey::HSE_OFFICER).with_project(project);
        let lead = user(RoleKey::CUSTOM_SITE_LEAD).with_project(project);
        let manager = user(RoleKey::HSE_MANAGER);

        assert!(!check(&r, Some(&officer), Action::Approve, Resource::Ptw, Some(&record)));
        assert!(check(&r, Some(&officer), Action::Assign, Resource::Ptw, Some(&record)));
        assert!(!check(&r, Some(&lead), Action::Close, Resource::Ptw, Some(&record.clone().with_creator(lead.id))));
        assert!(check(&r, Some(&manager), Action::Approve, Resource::Ptw, None));
        for action in [Action::Reject, Action::Close, Action::Delete] {
            assert!(!check(&r, Some(&manager), action, Resource::Ptw, None), "{action:?}");
        }
    }

    #[test]
    fn any_passing_rule_grants() {
        // Two rules on the same resource: one own-scoped, one organization-wide.
        let catalog = RoleCatalog {
            super_role: RoleKey::ADMIN,
            roles: vec![
                RoleDefinition::new(RoleKey::ADMIN, "Administrator", Scope::Organization),
                RoleDefinition::new(RoleKey::from_static("MIXED"), "Mixed", Scope::Own)
                    .rule(PermissionRule::new(Resource::Reports, &[Action::Update], Scope::Own))
                    .rule(
                        PermissionRule::new(Resource::Reports, &[Action::Update], Scope::Organization)
                            .when(Condition::high_risk_permit()),
                    ),
            ],
        };
        let r = RoleRegistry::load(catalog).unwrap();
        let u = user(RoleKey::from_static("MIXED"));
        let someone_elses_hot_work = SubjectData::default()
            .with_creator(UserId::new())
            .with_permit_type(PermitType::HotWork);

        let exp = explain(&r, Some(&u), Action::Update, Resource::Reports, Some(&someone_elses_hot_work));
        assert!(exp.granted);
        assert_eq!(exp.matched_rules, 2);
        assert_eq!(exp.granted_scope, Some(Scope::Organization));
    }

    #[test]
    fn inherited_rules_grant_to_child_roles() {
        let r = registry();
        let lead = user(RoleKey::CUSTOM_SITE_LEAD);
        // Tbt comes from SUPERVISOR only.
        assert!(check(&r, Some(&lead), Action::Assign, Resource::Tbt, None));
        let exp = explain(&r, Some(&lead), Action::Assign, Resource::Tbt, None);
        assert_eq!(exp.role_chain, vec!["CUSTOM_SITE_LEAD", "SUPERVISOR"]);
    }

    #[test]
    fn unknown_role_denies_without_panicking() {
        let r = registry();
        let ghost = user(RoleKey::from_static("GHOST"));
        assert!(!check(&r, Some(&ghost), Action::Read, Resource::Dashboard, None));
        assert_eq!(effective_scope(&r, Some(&ghost), Resource::Dashboard, Action::Read), None);
        assert_eq!(
            explain(&r, Some(&ghost), Action::Read, Resource::Dashboard, None).denial,
            Some(DenialKind::UnknownRole)
        );
    }

    #[test]
    fn effective_scope_reports_first_matching_rule() {
        let r = registry();
        assert_eq!(
            effective_scope(&r, Some(&user(RoleKey::WORKER)), Resource::Ptw, Action::Read),
            Some(Scope::Own)
        );
        assert_eq!(
            effective_scope(&r, Some(&user(RoleKey::SUPERVISOR)), Resource::Ptw, Action::Read),
            Some(Scope::Project)
        );
        assert_eq!(
            effective_scope(&r, Some(&user(RoleKey::WORKER)), Resource::Ptw, Action::Approve),
            None
        );
        assert_eq!(effective_scope(&r, None, Resource::Ptw, Action::Read), None);
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL.to_vec())
    }

    fn any_resource() -> impl Strategy<Value = Resource> {
        prop::sample::select(Resource::ALL.to_vec())
    }

    fn any_role() -> impl Strategy<Value = RoleKey> {
        let keys: Vec<RoleKey> = default_catalog().roles.into_iter().map(|r| r.key).collect();
        prop::sample::select(keys)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Every role's effective rules cover its parent's (resource, action) pairs.
        #[test]
        fn effective_rules_are_a_superset_of_the_parents(role in any_role()) {
            let r = registry();
            let chain = r.inheritance_chain(&role).unwrap().to_vec();
            for pair in chain.windows(2) {
                let child = r.resolve_effective_rules(&pair[0]).unwrap();
                let parent = r.resolve_effective_rules(&pair[1]).unwrap();
                for p in parent {
                    for a in &p.actions {
                        prop_assert!(child.iter().any(|c| c.matches(p.resource, *a)));
                    }
                }
            }
        }

        #[test]
        fn super_role_always_passes(
            action in any_action(),
            resource in any_resource(),
            with_subject in any::<bool>(),
        ) {
            let r = registry();
            let admin = user(RoleKey::ADMIN);
            let subject = SubjectData::default()
                .with_creator(UserId::new())
                .with_org(OrgId::new())
                .with_project(ProjectId::new());
            let subject = with_subject.then_some(&subject);
            prop_assert!(check(&r, Some(&admin), action, resource, subject));
        }

        #[test]
        fn check_is_deterministic(
            role in any_role(),
            action in any_action(),
            resource in any_resource(),
            owned in any::<bool>(),
        ) {
            let r = registry();
            let u = user(role);
            let owner = if owned { u.id } else { UserId::new() };
            let subject = SubjectData::default().with_creator(owner);
            let first = check(&r, Some(&u), action, resource, Some(&subject));
            for _ in 0..3 {
                prop_assert_eq!(check(&r, Some(&u), action, resource, Some(&subject)), first);
            }
        }

        /// For a role whose only rule is own-scoped, ownership alone decides.
        #[test]
        fn own_scope_matches_owner_exactly(
            action in any_action(),
            resource in any_resource(),
            owned in any::<bool>(),
        ) {
            let catalog = RoleCatalog {
                super_role: RoleKey::ADMIN,
                roles: vec![
                    RoleDefinition::new(RoleKey::ADMIN, "Administrator", Scope::Organization),
                    RoleDefinition::new(RoleKey::from_static("OWNER_ONLY"), "Owner only", Scope::Own)
                        .rule(PermissionRule::new(resource, &[action], Scope::Own)),
                ],
            };
            let r = RoleRegistry::load(catalog).unwrap();
            let u = user(RoleKey::from_static("OWNER_ONLY"));
            let owner = if owned { u.id } else { UserId::new() };
            let subject = SubjectData::default().with_creator(owner);
            prop_assert_eq!(check(&r, Some(&u), action, resource, Some(&subject)), owned);
        }
    }
}
