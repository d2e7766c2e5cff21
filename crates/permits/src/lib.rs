//! `sitesafe-permits` — the permit-to-work lifecycle.
//!
//! Pure decision logic only: the workflow graph, who may move a permit out of
//! each stage, the permit aggregate itself, risk scoring and simultaneous
//! operations (SIMOPS) conflict detection. Persistence lives in `sitesafe-infra`.

pub mod actor;
pub mod engine;
pub mod error;
pub mod payload;
pub mod permit;
pub mod risk;
pub mod simops;
pub mod stage;
pub mod workflow;

pub use actor::{ActorCheck, ActorPolicy, validate_actor};
pub use engine::{TransitionRequest, WorkflowEngine};
pub use error::WorkflowError;
pub use payload::{
    ElectricalIsolation, ExcavationDetails, FireWatch, GasTestReading, LoadCalculation,
    PermitPayload, RequirementResponse, SafetyRequirement, TimeWindow, TypeSpecificSection,
    WorkDetails,
};
pub use permit::{
    AnnotateRisk, AssignReceiver, CreatePermit, Permit, PermitCommand, PermitCreated, PermitEvent,
    PayloadUpdated, ReceiverAssigned, RiskAnnotated, SignoffMethod, StageTransitioned,
    TransitionStage, UpdatePayload, WorkflowLogEntry,
};
pub use risk::{RiskAnalysis, RiskTier, Weather, score, score_label};
pub use simops::{Conflict, ConflictKind, find_conflicts};
pub use stage::WorkflowStage;
pub use workflow::{can_transition, legal_next_stages, responsibilities};
