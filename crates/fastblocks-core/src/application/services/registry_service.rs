//! Registry Manager - catalog loading, lookup and search.

use tracing::{info, instrument};

use crate::{
    application::ports::CatalogSource,
    domain::{
        DependencyResolver, DomainError, DomainValidator as validator, ModuleDescriptor, Registry,
        ResolveTarget,
    },
    error::BlocksResult,
};

/// Read-only access to a validated module catalog.
#[derive(Debug, Clone)]
pub struct RegistryManager {
    registry: Registry,
}

impl RegistryManager {
    /// Load and validate a catalog. Validation is fail-fast: the first bad
    /// field rejects the whole catalog.
    #[instrument(skip_all, fields(source = %source.describe()))]
    pub fn load(source: &dyn CatalogSource) -> BlocksResult<Self> {
        let registry = source.load()?;
        validator::validate_registry(&registry)?;
        info!(modules = registry.len(), "Registry loaded");
        Ok(Self { registry })
    }

    /// Wrap an already-built registry, validating it.
    pub fn from_registry(registry: Registry) -> BlocksResult<Self> {
        validator::validate_registry(&registry)?;
        Ok(Self { registry })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn lookup(&self, id: &str) -> BlocksResult<&ModuleDescriptor> {
        self.registry
            .get(id)
            .ok_or_else(|| DomainError::ModuleNotFound { id: id.to_string() }.into())
    }

    /// All modules in declaration order.
    pub fn list(&self) -> &[ModuleDescriptor] {
        self.registry.modules()
    }

    /// Case-insensitive match on id, name or description.
    pub fn search(&self, query: &str) -> Vec<&ModuleDescriptor> {
        self.registry
            .modules()
            .iter()
            .filter(|m| m.matches(query))
            .collect()
    }

    /// Modules that list `id` in their `module_dependencies`.
    pub fn dependents(&self, id: &str) -> Vec<&ModuleDescriptor> {
        self.registry
            .modules()
            .iter()
            .filter(|m| m.module_dependencies.iter().any(|d| d == id))
            .collect()
    }

    /// Installation order for `target`, dependencies first.
    pub fn resolve(&self, target: &ResolveTarget) -> BlocksResult<Vec<&ModuleDescriptor>> {
        Ok(DependencyResolver::new(&self.registry).resolve(target)?)
    }
}
