//! Role registry: a validated, immutable snapshot of the role catalog.
//!
//! Inheritance is resolved once at load time. Every role's chain (self,
//! parent, ..., root) and effective rule list are precomputed, so a permission
//! check never walks parent pointers. Cycles, unknown parents and excessive
//! depth are rejected at load.
//!
//! Changes go through [`RegistryHandle`], which builds a complete new snapshot
//! and swaps it in atomically; readers keep whichever snapshot they already hold.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::permissions::PermissionRule;
use crate::roles::{RoleDefinition, RoleKey};

pub const DEFAULT_MAX_ROLE_DEPTH: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Unknown role key, unknown parent, duplicate key or malformed rule table.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("role inheritance cycle: {}", join_keys(.path))]
    Cycle { path: Vec<RoleKey> },

    #[error("role '{role}' exceeds maximum inheritance depth {max_depth}")]
    DepthExceeded { role: RoleKey, max_depth: usize },
}

impl RegistryError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

fn join_keys(path: &[RoleKey]) -> String {
    path.iter()
        .map(RoleKey::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Serializable role catalog: the configuration a registry is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCatalog {
    /// Role that bypasses rule evaluation entirely.
    pub super_role: RoleKey,
    pub roles: Vec<RoleDefinition>,
}

impl RoleCatalog {
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(json)
            .map_err(|e| RegistryError::configuration(format!("malformed role catalog: {e}")))
    }

    pub fn to_json_pretty(&self) -> Result<String, RegistryError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RegistryError::configuration(format!("unserializable role catalog: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct RoleRegistry {
    revision: u64,
    max_depth: usize,
    super_role: RoleKey,
    roles: BTreeMap<RoleKey, RoleDefinition>,
    /// Parents before children.
    order: Vec<RoleKey>,
    chains: HashMap<RoleKey, Vec<RoleKey>>,
    effective: HashMap<RoleKey, Vec<PermissionRule>>,
}

impl RoleRegistry {
    /// Validate a catalog and build the first snapshot (revision 1).
    pub fn load(catalog: RoleCatalog) -> Result<Self, RegistryError> {
        Self::load_with_depth(catalog, DEFAULT_MAX_ROLE_DEPTH)
    }

    pub fn load_with_depth(catalog: RoleCatalog, max_depth: usize) -> Result<Self, RegistryError> {
        let registry = Self::build(catalog, max_depth, 1).inspect_err(|e| {
            warn!(error = %e, "role catalog rejected");
        })?;
        info!(
            revision = registry.revision,
            roles = registry.roles.len(),
            super_role = %registry.super_role,
            "role registry loaded"
        );
        Ok(registry)
    }

    fn build(catalog: RoleCatalog, max_depth: usize, revision: u64) -> Result<Self, RegistryError> {
        if max_depth == 0 {
            return Err(RegistryError::configuration("maximum role depth must be at least 1"));
        }

        let mut roles: BTreeMap<RoleKey, RoleDefinition> = BTreeMap::new();
        for def in catalog.roles {
            if def.key.as_str().trim().is_empty() {
                return Err(RegistryError::configuration("role key must not be empty"));
            }
            for (idx, rule) in def.permissions.iter().enumerate() {
                if rule.actions.is_empty() {
                    return Err(RegistryError::configuration(format!(
                        "role '{}' rule #{idx} on {:?} grants no actions",
                        def.key, rule.resource
                    )));
                }
            }
            if roles.contains_key(&def.key) {
                return Err(RegistryError::configuration(format!(
                    "duplicate role key '{}'",
                    def.key
                )));
            }
            roles.insert(def.key.clone(), def);
        }

        if !roles.contains_key(&catalog.super_role) {
            return Err(RegistryError::configuration(format!(
                "super-role '{}' is not defined in the catalog",
                catalog.super_role
            )));
        }

        for def in roles.values() {
            if let Some(parent) = &def.inherits_from {
                if !roles.contains_key(parent) {
                    return Err(RegistryError::configuration(format!(
                        "role '{}' inherits from unknown role '{parent}'",
                        def.key
                    )));
                }
            }
        }

        let mut chains = HashMap::with_capacity(roles.len());
        for key in roles.keys() {
            let chain = walk_chain(&roles, key)?;
            if chain.len() > max_depth {
                return Err(RegistryError::DepthExceeded {
                    role: key.clone(),
                    max_depth,
                });
            }
            chains.insert(key.clone(), chain);
        }

        let mut order: Vec<RoleKey> = roles.keys().cloned().collect();
        order.sort_by(|a, b| chains[a].len().cmp(&chains[b].len()).then_with(|| a.cmp(b)));

        let effective = chains
            .iter()
            .map(|(key, chain)| {
                let rules = chain
                    .iter()
                    .filter_map(|k| roles.get(k))
                    .flat_map(|def| def.permissions.iter().cloned())
                    .collect();
                (key.clone(), rules)
            })
            .collect();

        Ok(Self {
            revision,
            max_depth,
            super_role: catalog.super_role,
            roles,
            order,
            chains,
            effective,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn super_role(&self) -> &RoleKey {
        &self.super_role
    }

    pub fn is_super_role(&self, key: &RoleKey) -> bool {
        key == &self.super_role
    }

    pub fn role(&self, key: &RoleKey) -> Option<&RoleDefinition> {
        self.roles.get(key)
    }

    pub fn contains(&self, key: &RoleKey) -> bool {
        self.roles.contains_key(key)
    }

    /// Roles in load order (every parent precedes its children).
    pub fn roles(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.order.iter().filter_map(|k| self.roles.get(k))
    }

    /// `[key, parent, grandparent, ..., root]`.
    pub fn inheritance_chain(&self, key: &RoleKey) -> Result<&[RoleKey], RegistryError> {
        self.chains
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| unknown_role(key))
    }

    /// The role's own rules followed by every ancestor's, child first.
    pub fn resolve_effective_rules(&self, key: &RoleKey) -> Result<&[PermissionRule], RegistryError> {
        self.effective
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| unknown_role(key))
    }

    pub fn to_catalog(&self) -> RoleCatalog {
        RoleCatalog {
            super_role: self.super_role.clone(),
            roles: self.roles().cloned().collect(),
        }
    }

    /// A new snapshot with `def` added, or replacing the role with the same key.
    pub fn with_role(&self, def: RoleDefinition) -> Result<Self, RegistryError> {
        let mut catalog = self.to_catalog();
        match catalog.roles.iter_mut().find(|r| r.key == def.key) {
            Some(existing) => *existing = def,
            None => catalog.roles.push(def),
        }
        Self::build(catalog, self.max_depth, self.revision + 1)
    }

    /// A new snapshot without `key`.
    ///
    /// Fails for the super-role and for roles other roles inherit from. Whether
    /// live users still hold the role is the caller's check.
    pub fn without_role(&self, key: &RoleKey) -> Result<Self, RegistryError> {
        if !self.contains(key) {
            return Err(unknown_role(key));
        }
        if self.is_super_role(key) {
            return Err(RegistryError::configuration(format!(
                "super-role '{key}' cannot be removed"
            )));
        }
        if let Some(child) = self
            .roles
            .values()
            .find(|r| r.inherits_from.as_ref() == Some(key))
        {
            return Err(RegistryError::configuration(format!(
                "role '{key}' is inherited by '{}'",
                child.key
            )));
        }

        let mut catalog = self.to_catalog();
        catalog.roles.retain(|r| &r.key != key);
        Self::build(catalog, self.max_depth, self.revision + 1)
    }
}

fn unknown_role(key: &RoleKey) -> RegistryError {
    RegistryError::configuration(format!("unknown role '{key}'"))
}

/// Follow parent links from `start` until a root or a revisit.
fn walk_chain(
    roles: &BTreeMap<RoleKey, RoleDefinition>,
    start: &RoleKey,
) -> Result<Vec<RoleKey>, RegistryError> {
    let mut chain = vec![start.clone()];
    let mut visited: HashSet<&RoleKey> = HashSet::from([start]);
    let mut current = roles.get(start).ok_or_else(|| unknown_role(start))?;

    while let Some(parent) = &current.inherits_from {
        chain.push(parent.clone());
        if !visited.insert(parent) {
            return Err(RegistryError::Cycle { path: chain });
        }
        current = roles.get(parent).ok_or_else(|| unknown_role(parent))?;
    }

    Ok(chain)
}

/// Shared, atomically replaceable registry snapshot.
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<Arc<RoleRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: RoleRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<RoleRegistry> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the whole catalog.
    pub fn reload(&self, catalog: RoleCatalog) -> Result<Arc<RoleRegistry>, RegistryError> {
        self.replace_with(|current| {
            RoleRegistry::build(catalog, current.max_depth, current.revision + 1)
        })
    }

    /// Add a role or a new version of an existing role.
    pub fn propose_role(&self, def: RoleDefinition) -> Result<Arc<RoleRegistry>, RegistryError> {
        self.replace_with(|current| current.with_role(def))
    }

    pub fn remove_role(&self, key: &RoleKey) -> Result<Arc<RoleRegistry>, RegistryError> {
        self.replace_with(|current| current.without_role(key))
    }

    // The write lock is held while the next snapshot is built so concurrent
    // proposals are serialized rather than lost.
    fn replace_with<F>(&self, build: F) -> Result<Arc<RoleRegistry>, RegistryError>
    where
        F: FnOnce(&RoleRegistry) -> Result<RoleRegistry, RegistryError>,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = match build(&guard) {
            Ok(next) => Arc::new(next),
            Err(e) => {
                warn!(error = %e, revision = guard.revision, "role registry change rejected");
                return Err(e);
            }
        };
        info!(
            from_revision = guard.revision,
            to_revision = next.revision,
            roles = next.roles.len(),
            "role registry replaced"
        );
        *guard = Arc::clone(&next);
        Ok(next)
    }
}
