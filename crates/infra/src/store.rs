//! Permit snapshot storage with compare-and-swap writes.
//!
//! A transition is committed only if the stored permit is still at the stage
//! (and optionally the version) the caller read. Two writers racing on the
//! same permit cannot both succeed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::warn;

use sitesafe_core::{AggregateRoot, ExpectedVersion, OrgId, PermitId};
use sitesafe_permits::{Permit, WorkflowStage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("permit {0} not found")]
    NotFound(PermitId),

    #[error("permit {0} already exists")]
    AlreadyExists(PermitId),

    /// The stored permit moved since the caller read it; refetch and retry.
    #[error("stale state for permit {permit_id}: {detail}")]
    StaleState { permit_id: PermitId, detail: String },

    #[error("store lock poisoned")]
    Poisoned,
}

pub trait PermitStore: Send + Sync {
    /// Store a newly created permit.
    fn insert(&self, permit: Permit) -> Result<(), StoreError>;

    fn load(&self, id: PermitId) -> Result<Permit, StoreError>;

    /// Replace the stored permit only if it is still at `expected_stage` and
    /// its version matches `expected_version`.
    fn compare_and_swap(
        &self,
        permit: Permit,
        expected_stage: WorkflowStage,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// Every permit belonging to `org_id`.
    fn list(&self, org_id: OrgId) -> Result<Vec<Permit>, StoreError>;
}

impl<S> PermitStore for Arc<S>
where
    S: PermitStore + ?Sized,
{
    fn insert(&self, permit: Permit) -> Result<(), StoreError> {
        (**self).insert(permit)
    }

    fn load(&self, id: PermitId) -> Result<Permit, StoreError> {
        (**self).load(id)
    }

    fn compare_and_swap(
        &self,
        permit: Permit,
        expected_stage: WorkflowStage,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).compare_and_swap(permit, expected_stage, expected_version)
    }

    fn list(&self, org_id: OrgId) -> Result<Vec<Permit>, StoreError> {
        (**self).list(org_id)
    }
}

/// In-memory permit store.
///
/// Intended for tests/dev. One lock guards the whole map, so every
/// compare-and-swap is serialized.
#[derive(Debug, Default)]
pub struct InMemoryPermitStore {
    permits: RwLock<HashMap<PermitId, Permit>>,
}

impl InMemoryPermitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermitStore for InMemoryPermitStore {
    fn insert(&self, permit: Permit) -> Result<(), StoreError> {
        let id = permit.id_typed();
        let mut permits = self.permits.write().map_err(|_| StoreError::Poisoned)?;
        if permits.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        permits.insert(id, permit);
        Ok(())
    }

    fn load(&self, id: PermitId) -> Result<Permit, StoreError> {
        let permits = self.permits.read().map_err(|_| StoreError::Poisoned)?;
        permits.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn compare_and_swap(
        &self,
        permit: Permit,
        expected_stage: WorkflowStage,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let id = permit.id_typed();
        let mut permits = self.permits.write().map_err(|_| StoreError::Poisoned)?;
        let current = permits.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if current.stage() != expected_stage || !expected_version.matches(current.version()) {
            let detail = format!(
                "expected {expected_stage} at {expected_version:?}, found {} at version {}",
                current.stage(),
                current.version()
            );
            warn!(permit_id = %id, %detail, "compare-and-swap rejected");
            return Err(StoreError::StaleState { permit_id: id, detail });
        }

        *current = permit;
        Ok(())
    }

    fn list(&self, org_id: OrgId) -> Result<Vec<Permit>, StoreError> {
        let permits = self.permits.read().map_err(|_| StoreError::Poisoned)?;
        Ok(permits
            .values()
            .filter(|p| p.org_id() == Some(org_id))
            .cloned()
            .collect())
    }
}
