//! `sitesafe-core` — shared building blocks for the permit-to-work decision core.
//!
//! This crate contains **pure domain** primitives (no IO, no storage, no transport).

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod permit_type;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{OrgId, PermitId, ProjectId, UserId};
pub use permit_type::{PermitCategory, PermitType, PermitTypeDetails};
