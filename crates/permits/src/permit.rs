use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitesafe_auth::SubjectData;
use sitesafe_core::{
    Aggregate, AggregateRoot, DomainError, Event, OrgId, PermitId, PermitType, ProjectId, UserId,
};

use crate::payload::{PermitPayload, TimeWindow};
use crate::risk::{self, RiskAnalysis, Weather};
use crate::stage::WorkflowStage;
use crate::workflow::can_transition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignoffMethod {
    #[default]
    Digital,
    /// Signed on paper and recorded after the fact.
    Manual,
}

/// One step of a permit's audit trail. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowLogEntry {
    /// Stage the permit entered.
    pub stage: WorkflowStage,
    pub action: String,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
    pub signoff: SignoffMethod,
}

/// Aggregate root: Permit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permit {
    id: PermitId,
    org_id: Option<OrgId>,
    project_id: Option<ProjectId>,
    permit_type: Option<PermitType>,
    stage: WorkflowStage,
    creator_id: Option<UserId>,
    receiver_id: Option<UserId>,
    payload: Option<PermitPayload>,
    risk: Option<RiskAnalysis>,
    log: Vec<WorkflowLogEntry>,
    version: u64,
    created: bool,
}

impl Permit {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PermitId) -> Self {
        Self {
            id,
            org_id: None,
            project_id: None,
            permit_type: None,
            stage: WorkflowStage::INITIAL,
            creator_id: None,
            receiver_id: None,
            payload: None,
            risk: None,
            log: Vec::new(),
            version: 0,
            created: false,
        }
    }

    /// Rebuild a permit from its event history.
    pub fn replay<'a>(id: PermitId, events: impl IntoIterator<Item = &'a PermitEvent>) -> Self {
        let mut permit = Self::empty(id);
        for event in events {
            permit.apply(event);
        }
        permit
    }

    pub fn id_typed(&self) -> PermitId {
        self.id
    }

    pub fn org_id(&self) -> Option<OrgId> {
        self.org_id
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn permit_type(&self) -> Option<PermitType> {
        self.permit_type
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn creator_id(&self) -> Option<UserId> {
        self.creator_id
    }

    pub fn receiver_id(&self) -> Option<UserId> {
        self.receiver_id
    }

    pub fn payload(&self) -> Option<&PermitPayload> {
        self.payload.as_ref()
    }

    pub fn risk(&self) -> Option<&RiskAnalysis> {
        self.risk.as_ref()
    }

    pub fn log(&self) -> &[WorkflowLogEntry] {
        &self.log
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn permit_no(&self) -> Option<&str> {
        self.payload.as_ref().map(|p| p.permit_no.as_str())
    }

    pub fn location(&self) -> Option<&str> {
        self.payload.as_ref().map(|p| p.work.location.as_str())
    }

    pub fn coverage(&self) -> Option<TimeWindow> {
        self.payload.as_ref().map(|p| p.work.coverage)
    }

    pub fn is_creator(&self, user_id: UserId) -> bool {
        self.creator_id == Some(user_id)
    }

    pub fn is_receiver(&self, user_id: UserId) -> bool {
        self.receiver_id == Some(user_id)
    }

    /// The attributes the permission evaluator reads.
    pub fn subject(&self) -> SubjectData {
        SubjectData {
            creator_id: self.creator_id,
            org_id: self.org_id,
            project_id: self.project_id,
            permit_type: self.permit_type,
            ..SubjectData::default()
        }
    }

    fn is_editable(&self) -> bool {
        matches!(self.stage, WorkflowStage::Draft)
    }

    fn is_open(&self) -> bool {
        !matches!(
            self.stage,
            WorkflowStage::Closed | WorkflowStage::Cancelled | WorkflowStage::Archived
        )
    }
}

impl AggregateRoot for Permit {
    type Id = PermitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePermit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePermit {
    pub permit_id: PermitId,
    pub org_id: OrgId,
    pub project_id: Option<ProjectId>,
    pub permit_type: PermitType,
    pub creator_id: UserId,
    pub payload: PermitPayload,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdatePayload. Only while the permit is in `DRAFT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub permit_id: PermitId,
    pub actor_id: UserId,
    pub payload: PermitPayload,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignReceiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignReceiver {
    pub permit_id: PermitId,
    pub actor_id: UserId,
    pub receiver_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AnnotateRisk. The analysis is recomputed from the inputs, never supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotateRisk {
    pub permit_id: PermitId,
    pub is_night_work: bool,
    pub weather: Weather,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TransitionStage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStage {
    pub permit_id: PermitId,
    pub actor_id: UserId,
    /// The stage the caller last read.
    pub expected_stage: WorkflowStage,
    pub target: WorkflowStage,
    pub comment: Option<String>,
    pub signoff: SignoffMethod,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PermitCommand {
    CreatePermit(CreatePermit),
    UpdatePayload(UpdatePayload),
    AssignReceiver(AssignReceiver),
    AnnotateRisk(AnnotateRisk),
    TransitionStage(TransitionStage),
}

/// Event: PermitCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitCreated {
    pub permit_id: PermitId,
    pub org_id: OrgId,
    pub project_id: Option<ProjectId>,
    pub permit_type: PermitType,
    pub creator_id: UserId,
    pub payload: PermitPayload,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PayloadUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadUpdated {
    pub permit_id: PermitId,
    pub actor_id: UserId,
    pub payload: PermitPayload,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiverAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverAssigned {
    pub permit_id: PermitId,
    pub actor_id: UserId,
    pub receiver_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RiskAnnotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnnotated {
    pub permit_id: PermitId,
    pub analysis: RiskAnalysis,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StageTransitioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransitioned {
    pub permit_id: PermitId,
    pub from: WorkflowStage,
    pub entry: WorkflowLogEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PermitEvent {
    PermitCreated(PermitCreated),
    PayloadUpdated(PayloadUpdated),
    ReceiverAssigned(ReceiverAssigned),
    RiskAnnotated(RiskAnnotated),
    StageTransitioned(StageTransitioned),
}

impl Event for PermitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PermitEvent::PermitCreated(_) => "permit.created",
            PermitEvent::PayloadUpdated(_) => "permit.payload_updated",
            PermitEvent::ReceiverAssigned(_) => "permit.receiver_assigned",
            PermitEvent::RiskAnnotated(_) => "permit.risk_annotated",
            PermitEvent::StageTransitioned(_) => "permit.stage_transitioned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PermitEvent::PermitCreated(e) => e.occurred_at,
            PermitEvent::PayloadUpdated(e) => e.occurred_at,
            PermitEvent::ReceiverAssigned(e) => e.occurred_at,
            PermitEvent::RiskAnnotated(e) => e.occurred_at,
            PermitEvent::StageTransitioned(e) => e.entry.timestamp,
        }
    }

    fn actor(&self) -> Option<UserId> {
        match self {
            PermitEvent::PermitCreated(e) => Some(e.creator_id),
            PermitEvent::PayloadUpdated(e) => Some(e.actor_id),
            PermitEvent::ReceiverAssigned(e) => Some(e.actor_id),
            PermitEvent::RiskAnnotated(_) => None,
            PermitEvent::StageTransitioned(e) => Some(e.entry.user_id),
        }
    }
}

impl Aggregate for Permit {
    type Command = PermitCommand;
    type Event = PermitEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PermitEvent::PermitCreated(e) => {
                self.id = e.permit_id;
                self.org_id = Some(e.org_id);
                self.project_id = e.project_id;
                self.permit_type = Some(e.permit_type);
                self.stage = WorkflowStage::INITIAL;
                self.creator_id = Some(e.creator_id);
                self.payload = Some(e.payload.clone());
                self.log.clear();
                self.created = true;
            }
            PermitEvent::PayloadUpdated(e) => {
                self.payload = Some(e.payload.clone());
            }
            PermitEvent::ReceiverAssigned(e) => {
                self.receiver_id = Some(e.receiver_id);
            }
            PermitEvent::RiskAnnotated(e) => {
                self.risk = Some(e.analysis.clone());
            }
            PermitEvent::StageTransitioned(e) => {
                self.stage = e.entry.stage;
                self.log.push(e.entry.clone());
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PermitCommand::CreatePermit(cmd) => self.handle_create(cmd),
            PermitCommand::UpdatePayload(cmd) => self.handle_update_payload(cmd),
            PermitCommand::AssignReceiver(cmd) => self.handle_assign_receiver(cmd),
            PermitCommand::AnnotateRisk(cmd) => self.handle_annotate_risk(cmd),
            PermitCommand::TransitionStage(cmd) => self.handle_transition(cmd),
        }
    }
}

impl Permit {
    fn ensure_exists(&self, permit_id: PermitId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != permit_id {
            return Err(DomainError::validation("permit_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreatePermit) -> Result<Vec<PermitEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("permit already exists"));
        }
        cmd.payload.validate(cmd.permit_type)?;

        Ok(vec![PermitEvent::PermitCreated(PermitCreated {
            permit_id: cmd.permit_id,
            org_id: cmd.org_id,
            project_id: cmd.project_id,
            permit_type: cmd.permit_type,
            creator_id: cmd.creator_id,
            payload: cmd.payload.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_payload(&self, cmd: &UpdatePayload) -> Result<Vec<PermitEvent>, DomainError> {
        self.ensure_exists(cmd.permit_id)?;

        if !self.is_editable() {
            return Err(DomainError::illegal_transition(format!(
                "payload can only be edited in DRAFT, permit is {}",
                self.stage
            )));
        }

        if let Some(permit_type) = self.permit_type {
            cmd.payload.validate(permit_type)?;
        }

        Ok(vec![PermitEvent::PayloadUpdated(PayloadUpdated {
            permit_id: cmd.permit_id,
            actor_id: cmd.actor_id,
            payload: cmd.payload.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_receiver(&self, cmd: &AssignReceiver) -> Result<Vec<PermitEvent>, DomainError> {
        self.ensure_exists(cmd.permit_id)?;

        if !self.is_open() {
            return Err(DomainError::illegal_transition(format!(
                "cannot assign a receiver to a {} permit",
                self.stage
            )));
        }

        Ok(vec![PermitEvent::ReceiverAssigned(ReceiverAssigned {
            permit_id: cmd.permit_id,
            actor_id: cmd.actor_id,
            receiver_id: cmd.receiver_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_annotate_risk(&self, cmd: &AnnotateRisk) -> Result<Vec<PermitEvent>, DomainError> {
        self.ensure_exists(cmd.permit_id)?;

        let permit_type = self
            .permit_type
            .ok_or_else(|| DomainError::validation("permit has no type"))?;

        Ok(vec![PermitEvent::RiskAnnotated(RiskAnnotated {
            permit_id: cmd.permit_id,
            analysis: risk::score(permit_type, cmd.is_night_work, cmd.weather),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transition(&self, cmd: &TransitionStage) -> Result<Vec<PermitEvent>, DomainError> {
        self.ensure_exists(cmd.permit_id)?;

        if self.stage != cmd.expected_stage {
            return Err(DomainError::conflict(format!(
                "permit is {}, caller expected {}",
                self.stage, cmd.expected_stage
            )));
        }

        if !can_transition(self.stage, cmd.target) {
            return Err(DomainError::illegal_transition(format!(
                "{} -> {}",
                self.stage, cmd.target
            )));
        }

        Ok(vec![PermitEvent::StageTransitioned(StageTransitioned {
            permit_id: cmd.permit_id,
            from: self.stage,
            entry: WorkflowLogEntry {
                stage: cmd.target,
                action: format!("Moved to {}", cmd.target),
                user_id: cmd.actor_id,
                timestamp: cmd.occurred_at,
                comment: cmd.comment.clone(),
                signoff: cmd.signoff,
            },
        })])
    }
}
