use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sitesafe_auth::{RoleKey, User};
use sitesafe_core::{Aggregate, DomainError};

use crate::actor::ActorPolicy;
use crate::error::WorkflowError;
use crate::permit::{Permit, PermitCommand, SignoffMethod, TransitionStage};
use crate::stage::WorkflowStage;
use crate::workflow::{can_transition, legal_next_stages};

/// A caller's request to move a permit. The target stage is always explicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: WorkflowStage,
    pub comment: Option<String>,
    pub signoff: SignoffMethod,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionRequest {
    pub fn new(target: WorkflowStage, occurred_at: DateTime<Utc>) -> Self {
        Self {
            target,
            comment: None,
            signoff: SignoffMethod::default(),
            occurred_at,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_signoff(mut self, signoff: SignoffMethod) -> Self {
        self.signoff = signoff;
        self
    }
}

/// Applies stage transitions to permit snapshots.
///
/// Never mutates its input: a successful transition returns a new permit
/// (stage moved, log entry appended, version bumped) for the caller to persist.
#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    policy: ActorPolicy,
}

impl WorkflowEngine {
    pub fn new(policy: ActorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ActorPolicy {
        &self.policy
    }

    /// This engine with `role` as the super-role, e.g. after a registry reload.
    pub fn for_super_role(&self, role: &RoleKey) -> Self {
        if self.policy.is_super_role(role) {
            return self.clone();
        }
        Self::new(self.policy.clone().with_super_role(role.clone()))
    }

    pub fn legal_next_stages(&self, permit: &Permit) -> &'static [WorkflowStage] {
        legal_next_stages(permit.stage())
    }

    pub fn transition(
        &self,
        permit: &Permit,
        user: &User,
        request: TransitionRequest,
    ) -> Result<Permit, WorkflowError> {
        if !permit.is_created() {
            return Err(DomainError::not_found().into());
        }

        let from = permit.stage();
        let to = request.target;

        if !can_transition(from, to) {
            return Err(WorkflowError::IllegalTransition { from, to });
        }

        if !self.policy.is_super_role(&user.role) && permit.org_id() != Some(user.org_id) {
            return Err(WorkflowError::ActorRejected {
                stage: from,
                reason: "permit belongs to a different organization".to_string(),
            });
        }

        let check = self.policy.validate_actor(from, &user.role, user.id, permit);
        if !check.allowed {
            warn!(
                permit_id = %permit.id_typed(),
                user_id = %user.id,
                role = %user.role,
                stage = %from,
                reason = %check.reason,
                "workflow actor rejected"
            );
            return Err(WorkflowError::ActorRejected {
                stage: from,
                reason: check.reason,
            });
        }

        let command = PermitCommand::TransitionStage(TransitionStage {
            permit_id: permit.id_typed(),
            actor_id: user.id,
            expected_stage: from,
            target: to,
            comment: request.comment,
            signoff: request.signoff,
            occurred_at: request.occurred_at,
        });
        let events = permit.handle(&command)?;

        let mut next = permit.clone();
        for event in &events {
            next.apply(event);
        }

        info!(
            permit_id = %permit.id_typed(),
            %from,
            %to,
            actor = %user.id,
            "permit transitioned"
        );
        Ok(next)
    }

    /// Like [`transition`](Self::transition), but first confirms the permit is
    /// still at the stage the caller last read.
    pub fn transition_expecting(
        &self,
        permit: &Permit,
        expected: WorkflowStage,
        user: &User,
        request: TransitionRequest,
    ) -> Result<Permit, WorkflowError> {
        if permit.stage() != expected {
            return Err(WorkflowError::StaleState {
                expected,
                actual: permit.stage(),
            });
        }
        self.transition(permit, user, request)
    }
}
