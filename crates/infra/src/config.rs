//! Process configuration: where the role catalog comes from and how it is checked.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use sitesafe_auth::{
    DEFAULT_MAX_ROLE_DEPTH, RegistryError, RoleCatalog, RoleKey, RoleRegistry, default_catalog,
};
use sitesafe_permits::ActorPolicy;

pub const ENV_ROLE_CATALOG: &str = "SITESAFE_ROLE_CATALOG";
pub const ENV_SUPER_ROLE: &str = "SITESAFE_SUPER_ROLE";
pub const ENV_MAX_ROLE_DEPTH: &str = "SITESAFE_MAX_ROLE_DEPTH";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// JSON role catalog on disk. `None` uses the built-in catalog.
    pub role_catalog_path: Option<PathBuf>,
    /// Overrides the catalog's super-role when set.
    pub super_role: Option<RoleKey>,
    /// Longest inheritance chain the registry accepts.
    pub max_role_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            role_catalog_path: None,
            super_role: None,
            max_role_depth: DEFAULT_MAX_ROLE_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn with_role_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.role_catalog_path = Some(path.into());
        self
    }

    pub fn with_super_role(mut self, role: RoleKey) -> Self {
        self.super_role = Some(role);
        self
    }

    pub fn with_max_role_depth(mut self, depth: usize) -> Self {
        self.max_role_depth = depth;
        self
    }

    /// Read `SITESAFE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, RegistryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RegistryError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(path) = get(ENV_ROLE_CATALOG) {
            config.role_catalog_path = Some(PathBuf::from(path));
        }

        if let Some(role) = get(ENV_SUPER_ROLE) {
            config.super_role = Some(RoleKey::new(role));
        }

        if let Some(depth) = get(ENV_MAX_ROLE_DEPTH) {
            let depth: usize = depth.parse().map_err(|_| {
                RegistryError::configuration(format!("{ENV_MAX_ROLE_DEPTH} must be a positive integer, got '{depth}'"))
            })?;
            if depth == 0 {
                return Err(RegistryError::configuration(format!("{ENV_MAX_ROLE_DEPTH} must be at least 1")));
            }
            config.max_role_depth = depth;
        }

        Ok(config)
    }

    /// The catalog this configuration names, with the super-role override applied.
    pub fn load_catalog(&self) -> anyhow::Result<RoleCatalog> {
        let mut catalog = match &self.role_catalog_path {
            Some(path) => read_catalog(path)?,
            None => default_catalog(),
        };
        if let Some(role) = &self.super_role {
            catalog.super_role = role.clone();
        }
        Ok(catalog)
    }

    /// Load and validate the role registry. Any failure here must stop startup.
    pub fn load_registry(&self) -> anyhow::Result<RoleRegistry> {
        let catalog = self.load_catalog()?;
        let registry = RoleRegistry::load_with_depth(catalog, self.max_role_depth)
            .context("role catalog failed validation")?;
        info!(
            source = %self.role_catalog_path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "built-in".to_string()),
            super_role = %registry.super_role(),
            "role registry ready"
        );
        Ok(registry)
    }

    /// Workflow actor policy whose super-role agrees with `registry`.
    pub fn actor_policy(&self, registry: &RoleRegistry) -> ActorPolicy {
        ActorPolicy::default().with_super_role(registry.super_role().clone())
    }
}

fn read_catalog(path: &Path) -> anyhow::Result<RoleCatalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read role catalog {}", path.display()))?;
    let catalog = RoleCatalog::from_json_str(&raw)
        .with_context(|| format!("failed to parse role catalog {}", path.display()))?;
    Ok(catalog)
}
