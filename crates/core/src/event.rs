use chrono::{DateTime, Utc};

use crate::id::UserId;

/// A fact recorded against an aggregate.
///
/// Events are immutable and append-only; an aggregate's ordered event
/// sequence is its audit trail.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "permit.stage_transitioned").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// The user who caused the event, when one is recorded.
    fn actor(&self) -> Option<UserId>;
}
