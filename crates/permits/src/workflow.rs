//! The permit lifecycle graph.
//!
//! The table is static: `legal_next_stages` is a lookup, never a search.

use crate::stage::WorkflowStage;

use WorkflowStage::*;

/// Stages reachable in one step from `stage`. Empty for `ARCHIVED`.
pub fn legal_next_stages(stage: WorkflowStage) -> &'static [WorkflowStage] {
    match stage {
        Draft => &[Requested],
        Requested => &[IssuerReview, Draft],
        IssuerReview => &[IssuerSigned, Draft],
        IssuerSigned => &[IvReview, PendingApproval],
        IvReview => &[PendingApproval, Draft],
        PendingApproval => &[Approved, Draft],
        Approved => &[Active, Cancelled],
        Active => &[Suspended, CompletionPending, Hold],
        Hold => &[Active, Cancelled],
        Suspended => &[Active, Cancelled],
        CompletionPending => &[Closed, Active],
        Closed => &[Archived],
        Cancelled => &[Archived],
        Archived => &[],
    }
}

pub fn can_transition(from: WorkflowStage, to: WorkflowStage) -> bool {
    legal_next_stages(from).contains(&to)
}

/// Who has to do what while a permit sits in `stage`.
pub fn responsibilities(stage: WorkflowStage) -> &'static [&'static str] {
    match stage {
        Draft => &["Requester: Complete application details"],
        Requested => &["Issuer: Review application", "HSE: Verify risk assessment"],
        IssuerReview => &["Issuer: Verify site conditions", "Issuer: Confirm isolations"],
        IssuerSigned => &["IV Provider: Independent verification (if critical)"],
        IvReview => &["IV Provider: Conduct safety review", "IV Provider: Verify controls"],
        PendingApproval => &["Approver: Review and authorize"],
        Approved => &["Issuer: Hand over permit to receiver"],
        Active => &["Receiver: Supervise work", "Safety Watch: Monitor conditions"],
        Hold => &["Receiver: Stop work", "Issuer: Verify safety"],
        Suspended => &["Receiver: Secure work area", "Issuer: Review suspension reason"],
        CompletionPending => &["Receiver: Clean work area", "Receiver: Remove tools"],
        Closed => &["Issuer: Archive documents", "System: Update asset records"],
        Cancelled => &["Issuer: Document cancellation reason"],
        Archived => &["System: Retention period compliance"],
    }
}
