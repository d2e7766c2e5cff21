//! Permit command pipeline (application-level orchestration).
//!
//! ```text
//! request
//!   ↓
//! 1. Authorize against the current role registry snapshot
//!   ↓
//! 2. Load the permit snapshot from the store
//!   ↓
//! 3. Decide (workflow engine / aggregate `handle`, pure)
//!   ↓
//! 4. Compare-and-swap the new snapshot on (stage, version) read in step 2
//! ```
//!
//! A lost race surfaces as `DispatchError::StaleState`; the caller refetches
//! and decides whether to retry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use sitesafe_auth::{Action, RegistryHandle, Resource, SubjectData, User, check};
use sitesafe_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, PermitId};
use sitesafe_permits::{
    AnnotateRisk, AssignReceiver, Conflict, CreatePermit, Permit, PermitCommand, PermitPayload,
    TimeWindow, TransitionRequest, UpdatePayload, Weather, WorkflowEngine, WorkflowError,
    WorkflowStage, find_conflicts,
};

use crate::store::{PermitStore, StoreError};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The permission evaluator denied the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The permit moved since the caller read it.
    #[error("stale state: {0}")]
    StaleState(String),

    #[error("permit not found")]
    NotFound,

    #[error(transparent)]
    Workflow(WorkflowError),

    #[error(transparent)]
    Domain(DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DispatchError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::StaleState { detail, .. } => DispatchError::StaleState(detail),
            StoreError::NotFound(_) => DispatchError::NotFound,
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Conflict(msg) => DispatchError::StaleState(msg),
            DomainError::NotFound => DispatchError::NotFound,
            other => DispatchError::Domain(other),
        }
    }
}

impl From<WorkflowError> for DispatchError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::StaleState { expected, actual } => {
                DispatchError::StaleState(format!("expected {expected}, found {actual}"))
            }
            WorkflowError::Domain(e) => e.into(),
            other => DispatchError::Workflow(other),
        }
    }
}

/// Runs permit commands against a store, authorizing each against the live registry.
#[derive(Debug)]
pub struct TransitionDispatcher<S> {
    store: S,
    registry: Arc<RegistryHandle>,
    engine: WorkflowEngine,
}

impl<S> TransitionDispatcher<S> {
    pub fn new(store: S, registry: Arc<RegistryHandle>, engine: WorkflowEngine) -> Self {
        Self {
            store,
            registry,
            engine,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }
}

impl<S> TransitionDispatcher<S>
where
    S: PermitStore,
{
    fn authorize(
        &self,
        user: &User,
        action: Action,
        subject: &SubjectData,
    ) -> Result<(), DispatchError> {
        let registry = self.registry.snapshot();
        if check(&registry, Some(user), action, Resource::Ptw, Some(subject)) {
            return Ok(());
        }
        Err(DispatchError::Unauthorized(format!(
            "role '{}' may not {action:?} this permit",
            user.role
        )))
    }

    pub fn create(&self, user: &User, command: CreatePermit) -> Result<Permit, DispatchError> {
        if command.creator_id != user.id {
            return Err(DispatchError::Unauthorized(
                "permits are created on behalf of the acting user only".to_string(),
            ));
        }

        let subject = SubjectData::default()
            .with_creator(user.id)
            .with_org(command.org_id)
            .with_permit_type(command.permit_type);
        let subject = match command.project_id {
            Some(project) => subject.with_project(project),
            None => subject,
        };
        self.authorize(user, Action::Create, &subject)?;

        let id = command.permit_id;
        let events = Permit::empty(id).handle(&PermitCommand::CreatePermit(command))?;
        let permit = Permit::replay(id, &events);
        self.store.insert(permit.clone())?;

        info!(permit_id = %id, creator = %user.id, "permit created");
        Ok(permit)
    }

    /// Move a permit to `request.target`.
    ///
    /// `expected_stage` is the stage the caller last saw; if the permit has
    /// moved since, nothing is written. The super-role is taken from the
    /// registry snapshot in effect for this call.
    pub fn transition(
        &self,
        permit_id: PermitId,
        expected_stage: WorkflowStage,
        user: &User,
        request: TransitionRequest,
    ) -> Result<Permit, DispatchError> {
        let current = self.store.load(permit_id)?;
        let registry = self.registry.snapshot();
        let next = self
            .engine
            .for_super_role(registry.super_role())
            .transition_expecting(&current, expected_stage, user, request)?;

        self.store.compare_and_swap(
            next.clone(),
            expected_stage,
            ExpectedVersion::Exact(current.version()),
        )?;
        Ok(next)
    }

    pub fn update_payload(
        &self,
        permit_id: PermitId,
        user: &User,
        payload: PermitPayload,
        occurred_at: DateTime<Utc>,
    ) -> Result<Permit, DispatchError> {
        self.execute(permit_id, user, Action::Update, |_| {
            PermitCommand::UpdatePayload(UpdatePayload {
                permit_id,
                actor_id: user.id,
                payload,
                occurred_at,
            })
        })
    }

    pub fn assign_receiver(
        &self,
        permit_id: PermitId,
        user: &User,
        receiver: &User,
        occurred_at: DateTime<Utc>,
    ) -> Result<Permit, DispatchError> {
        if receiver.org_id != user.org_id {
            return Err(DispatchError::Unauthorized(
                "receiver must belong to the permit's organization".to_string(),
            ));
        }
        self.execute(permit_id, user, Action::Assign, |_| {
            PermitCommand::AssignReceiver(AssignReceiver {
                permit_id,
                actor_id: user.id,
                receiver_id: receiver.id,
                occurred_at,
            })
        })
    }

    pub fn annotate_risk(
        &self,
        permit_id: PermitId,
        user: &User,
        is_night_work: bool,
        weather: Weather,
        occurred_at: DateTime<Utc>,
    ) -> Result<Permit, DispatchError> {
        self.execute(permit_id, user, Action::Update, |_| {
            PermitCommand::AnnotateRisk(AnnotateRisk {
                permit_id,
                is_night_work,
                weather,
                occurred_at,
            })
        })
    }

    /// Active permits in the user's organization that clash with a proposed job.
    pub fn simops_conflicts(
        &self,
        user: &User,
        location: &str,
        window: &TimeWindow,
    ) -> Result<Vec<Conflict>, DispatchError> {
        let permits = self.store.list(user.org_id)?;
        Ok(find_conflicts(location, window, &permits))
    }

    fn execute(
        &self,
        permit_id: PermitId,
        user: &User,
        action: Action,
        make_command: impl FnOnce(&Permit) -> PermitCommand,
    ) -> Result<Permit, DispatchError> {
        let current = self.store.load(permit_id)?;
        self.authorize(user, action, &current.subject())?;

        let command = make_command(&current);
        let events = current.handle(&command)?;
        let mut next = current.clone();
        for event in &events {
            next.apply(event);
        }

        self.store.compare_and_swap(
            next.clone(),
            current.stage(),
            ExpectedVersion::Exact(current.version()),
        )?;
        debug!(permit_id = %permit_id, ?action, version = next.version(), "permit updated");
        Ok(next)
    }
}
