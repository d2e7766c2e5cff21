//! Who may move a permit out of each stage.
//!
//! The rule depends only on the stage the permit is leaving, not on which
//! legal next stage is chosen.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use sitesafe_auth::RoleKey;
use sitesafe_core::UserId;

use crate::permit::Permit;
use crate::stage::WorkflowStage;

/// Outcome of an actor check. A denial is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorCheck {
    pub allowed: bool,
    pub reason: String,
}

impl ActorCheck {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Role classes used by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPolicy {
    pub super_role: RoleKey,
    /// Roles that review and put permits into effect.
    pub issuer_roles: BTreeSet<RoleKey>,
    /// Roles that sign off and authorize permits.
    pub approver_roles: BTreeSet<RoleKey>,
}

impl Default for ActorPolicy {
    fn default() -> Self {
        Self {
            super_role: RoleKey::ADMIN,
            issuer_roles: BTreeSet::from([RoleKey::SUPERVISOR, RoleKey::HSE_MANAGER]),
            approver_roles: BTreeSet::from([RoleKey::HSE_MANAGER, RoleKey::ORG_ADMIN]),
        }
    }
}

static DEFAULT_POLICY: LazyLock<ActorPolicy> = LazyLock::new(ActorPolicy::default);

impl ActorPolicy {
    pub fn with_super_role(mut self, role: RoleKey) -> Self {
        self.super_role = role;
        self
    }

    pub fn with_issuer(mut self, role: RoleKey) -> Self {
        self.issuer_roles.insert(role);
        self
    }

    pub fn with_approver(mut self, role: RoleKey) -> Self {
        self.approver_roles.insert(role);
        self
    }

    pub fn is_super_role(&self, role: &RoleKey) -> bool {
        &self.super_role == role
    }

    pub fn is_issuer(&self, role: &RoleKey) -> bool {
        self.issuer_roles.contains(role)
    }

    pub fn is_approver(&self, role: &RoleKey) -> bool {
        self.approver_roles.contains(role)
    }

    /// May `user_id`, holding `role`, move `permit` out of `stage`?
    pub fn validate_actor(
        &self,
        stage: WorkflowStage,
        role: &RoleKey,
        user_id: UserId,
        permit: &Permit,
    ) -> ActorCheck {
        use WorkflowStage::*;

        if self.is_super_role(role) {
            return ActorCheck::allow("super-role override");
        }

        let issuer = self.is_issuer(role);
        let approver = self.is_approver(role);

        match stage {
            Draft => {
                if permit.is_creator(user_id) || permit.is_receiver(user_id) || issuer || approver {
                    ActorCheck::allow("associated with the permit")
                } else {
                    ActorCheck::deny("only users associated with the permit can submit it")
                }
            }
            Requested | IssuerReview => issuer_only(issuer, "only an issuer can review requested permits"),
            IssuerSigned | IvReview | PendingApproval => {
                if !approver {
                    ActorCheck::deny("only an approver can sign off at this stage")
                } else if permit.is_creator(user_id) {
                    ActorCheck::deny("the permit creator cannot approve their own permit")
                } else {
                    ActorCheck::allow("approver")
                }
            }
            Approved => issuer_only(issuer, "only an issuer can put the permit into effect"),
            Active => {
                if permit.is_receiver(user_id) || permit.is_creator(user_id) {
                    ActorCheck::allow("permit receiver")
                } else {
                    issuer_only(issuer, "only the receiver or an issuer can update work status")
                }
            }
            CompletionPending => issuer_only(issuer, "only an issuer can close out completed work"),
            Closed => issuer_only(issuer, "only an issuer can archive a permit"),
            Archived => ActorCheck::deny("archived permits cannot change"),
            Hold | Suspended | Cancelled => {
                ActorCheck::deny(format!("no role may move a permit out of {stage}"))
            }
        }
    }
}

fn issuer_only(issuer: bool, denial: &str) -> ActorCheck {
    if issuer {
        ActorCheck::allow("issuer")
    } else {
        ActorCheck::deny(denial)
    }
}

/// [`ActorPolicy::validate_actor`] under the default role classes.
pub fn validate_actor(
    stage: WorkflowStage,
    role: &RoleKey,
    user_id: UserId,
    permit: &Permit,
) -> ActorCheck {
    DEFAULT_POLICY.validate_actor(stage, role, user_id, permit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permit::tests::test_permit;
    use proptest::prelude::*;
    use sitesafe_core::{OrgId, PermitType};

    fn draft_permit(creator: UserId) -> Permit {
        test_permit(PermitType::HotWork, creator, OrgId::new())
    }

    #[test]
    fn super_role_always_passes() {
        let creator = UserId::new();
        let permit = draft_permit(creator);
        for stage in WorkflowStage::ALL {
            assert!(validate_actor(stage, &RoleKey::ADMIN, creator, &permit).allowed);
        }
    }

    #[test]
    fn draft_requires_association() {
        let creator = UserId::new();
        let permit = draft_permit(creator);

        assert!(validate_actor(WorkflowStage::Draft, &RoleKey::WORKER, creator, &permit).allowed);
        assert!(validate_actor(WorkflowStage::Draft, &RoleKey::SUPERVISOR, UserId::new(), &permit).allowed);

        let stranger = validate_actor(WorkflowStage::Draft, &RoleKey::WORKER, UserId::new(), &permit);
        assert!(!stranger.allowed);
        assert!(!stranger.reason.is_empty());
    }

    #[test]
    fn review_stages_need_an_issuer() {
        let permit = draft_permit(UserId::new());
        let someone = UserId::new();
        for stage in [WorkflowStage::Requested, WorkflowStage::IssuerReview, WorkflowStage::Approved] {
            assert!(validate_actor(stage, &RoleKey::SUPERVISOR, someone, &permit).allowed);
            assert!(!validate_actor(stage, &RoleKey::WORKER, someone, &permit).allowed);
            assert!(!validate_actor(stage, &RoleKey::HSE_OFFICER, someone, &permit).allowed);
        }
    }

    #[test]
    fn pending_approval_segregates_duties() {
        let creator = UserId::new();
        let permit = draft_permit(creator);

        assert!(validate_actor(WorkflowStage::PendingApproval, &RoleKey::HSE_MANAGER, UserId::new(), &permit).allowed);
        assert!(validate_actor(WorkflowStage::PendingApproval, &RoleKey::ORG_ADMIN, UserId::new(), &permit).allowed);
        assert!(!validate_actor(WorkflowStage::PendingApproval, &RoleKey::HSE_MANAGER, creator, &permit).allowed);
        assert!(!validate_actor(WorkflowStage::PendingApproval, &RoleKey::SUPERVISOR, UserId::new(), &permit).allowed);
    }

    #[test]
    fn archived_denies_everyone_but_the_super_role() {
        let permit = draft_permit(UserId::new());
        for role in [RoleKey::HSE_MANAGER, RoleKey::SUPERVISOR, RoleKey::ORG_ADMIN] {
            assert!(!validate_actor(WorkflowStage::Archived, &role, UserId::new(), &permit).allowed);
        }
    }

    #[test]
    fn stopped_and_cancelled_permits_need_the_super_role() {
        let creator = UserId::new();
        let permit = draft_permit(creator);
        for stage in [WorkflowStage::Hold, WorkflowStage::Suspended, WorkflowStage::Cancelled] {
            for role in [RoleKey::SUPERVISOR, RoleKey::HSE_MANAGER, RoleKey::ORG_ADMIN] {
                assert!(!validate_actor(stage, &role, UserId::new(), &permit).allowed);
            }
            assert!(!validate_actor(stage, &RoleKey::WORKER, creator, &permit).allowed);
            assert!(validate_actor(stage, &RoleKey::ADMIN, UserId::new(), &permit).allowed);
        }
    }

    #[test]
    fn closed_permits_are_archived_by_an_issuer() {
        let permit = draft_permit(UserId::new());
        assert!(validate_actor(WorkflowStage::Closed, &RoleKey::SUPERVISOR, UserId::new(), &permit).allowed);
        assert!(!validate_actor(WorkflowStage::Closed, &RoleKey::WORKER, UserId::new(), &permit).allowed);
    }

    #[test]
    fn custom_policy_extends_role_classes() {
        let policy = ActorPolicy::default().with_issuer(RoleKey::CUSTOM_SITE_LEAD);
        let permit = draft_permit(UserId::new());
        assert!(policy.validate_actor(WorkflowStage::Requested, &RoleKey::CUSTOM_SITE_LEAD, UserId::new(), &permit).allowed);
        assert!(!validate_actor(WorkflowStage::Requested, &RoleKey::CUSTOM_SITE_LEAD, UserId::new(), &permit).allowed);
    }

    fn any_non_super_role() -> impl Strategy<Value = RoleKey> {
        prop::sample::select(vec![
            RoleKey::ORG_ADMIN,
            RoleKey::HSE_MANAGER,
            RoleKey::SUPERVISOR,
            RoleKey::HSE_OFFICER,
            RoleKey::INSPECTOR,
            RoleKey::WORKER,
            RoleKey::CLIENT_VIEWER,
            RoleKey::CUSTOM_SITE_LEAD,
            RoleKey::GUEST,
        ])
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn creator_never_leaves_pending_approval(role in any_non_super_role()) {
            let creator = UserId::new();
            let permit = draft_permit(creator);
            prop_assert!(!validate_actor(WorkflowStage::PendingApproval, &role, creator, &permit).allowed);
        }
    }
}
