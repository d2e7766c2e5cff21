use thiserror::Error;

use sitesafe_core::DomainError;

use crate::stage::WorkflowStage;

/// Why a workflow transition was rejected.
///
/// Every variant is recoverable: the caller surfaces it as a rejected action
/// or, for `StaleState`, refetches the permit and retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// `to` is not in `legal_next_stages(from)`.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: WorkflowStage,
        to: WorkflowStage,
    },

    /// The actor may not move the permit out of `stage`.
    #[error("actor rejected at {stage}: {reason}")]
    ActorRejected {
        stage: WorkflowStage,
        reason: String,
    },

    /// The permit moved since the caller read it.
    #[error("stale state: expected {expected}, found {actual}")]
    StaleState {
        expected: WorkflowStage,
        actual: WorkflowStage,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
