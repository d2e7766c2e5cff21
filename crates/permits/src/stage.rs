use core::str::FromStr;

use serde::{Deserialize, Serialize};

use sitesafe_core::DomainError;

/// Permit lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    Draft,
    Requested,
    IssuerReview,
    IssuerSigned,
    IvReview,
    PendingApproval,
    Approved,
    Active,
    Suspended,
    Hold,
    CompletionPending,
    Closed,
    Cancelled,
    Archived,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 14] = [
        WorkflowStage::Draft,
        WorkflowStage::Requested,
        WorkflowStage::IssuerReview,
        WorkflowStage::IssuerSigned,
        WorkflowStage::IvReview,
        WorkflowStage::PendingApproval,
        WorkflowStage::Approved,
        WorkflowStage::Active,
        WorkflowStage::Suspended,
        WorkflowStage::Hold,
        WorkflowStage::CompletionPending,
        WorkflowStage::Closed,
        WorkflowStage::Cancelled,
        WorkflowStage::Archived,
    ];

    /// The stage every permit starts in.
    pub const INITIAL: WorkflowStage = WorkflowStage::Draft;

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::Draft => "DRAFT",
            WorkflowStage::Requested => "REQUESTED",
            WorkflowStage::IssuerReview => "ISSUER_REVIEW",
            WorkflowStage::IssuerSigned => "ISSUER_SIGNED",
            WorkflowStage::IvReview => "IV_REVIEW",
            WorkflowStage::PendingApproval => "PENDING_APPROVAL",
            WorkflowStage::Approved => "APPROVED",
            WorkflowStage::Active => "ACTIVE",
            WorkflowStage::Suspended => "SUSPENDED",
            WorkflowStage::Hold => "HOLD",
            WorkflowStage::CompletionPending => "COMPLETION_PENDING",
            WorkflowStage::Closed => "CLOSED",
            WorkflowStage::Cancelled => "CANCELLED",
            WorkflowStage::Archived => "ARCHIVED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStage::Archived)
    }
}

impl core::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        WorkflowStage::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| DomainError::validation(format!("unknown workflow stage '{s}'")))
    }
}
