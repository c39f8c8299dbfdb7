use std::sync::LazyLock;

use regex::Regex;

use crate::domain::entities::{ModuleDescriptor, Registry};
use crate::domain::error::DomainError;

static PROJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid project name regex"));

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid identifier regex"));

static PYTHON_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("valid python identifier regex"));

/// Centralized domain validation.
///
/// All validation logic lives here, not scattered across entities.
pub struct DomainValidator;

impl DomainValidator {
    pub fn validate_project_name(name: &str) -> Result<(), DomainError> {
        if PROJECT_NAME.is_match(name) {
            return Ok(());
        }
        let reason = if name.is_empty() {
            "name is empty"
        } else if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            "must start with a letter"
        } else {
            "only letters, digits, '_' and '-' are allowed"
        };
        Err(DomainError::InvalidProjectName {
            name: name.to_string(),
            reason: reason.into(),
        })
    }

    /// Semantic checks on a descriptor; errors carry the catalog field path.
    pub fn validate_descriptor(module: &ModuleDescriptor) -> Result<(), DomainError> {
        let field = |name: &str, reason: &str| DomainError::InvalidCatalog {
            path: format!("modules.{}.{}", module.id, name),
            reason: reason.to_string(),
        };

        if !IDENTIFIER.is_match(&module.id) {
            return Err(DomainError::InvalidCatalog {
                path: format!("modules.{}", module.id),
                reason: "module id must start with a letter and use letters, digits, '_' or '-'"
                    .into(),
            });
        }
        if !module.route.prefix.starts_with('/') {
            return Err(field("router_prefix", "must start with '/'"));
        }
        if module.file_manifest.is_empty() {
            return Err(field("files", "module has no files to install"));
        }
        if let Some((i, _)) = module
            .environment
            .variables
            .iter()
            .enumerate()
            .find(|(_, (k, _))| k.is_empty() || k.contains(['=', ' ', '#']))
        {
            return Err(field(&format!("env.variables[{}]", i), "invalid variable name"));
        }
        if let Some(i) = module
            .runtime_packages
            .iter()
            .position(|p| p.name.is_empty())
        {
            return Err(field(&format!("dependencies[{}]", i), "empty package name"));
        }
        Ok(())
    }

    /// Cross-entry checks once the whole catalog is loaded.
    pub fn validate_registry(registry: &Registry) -> Result<(), DomainError> {
        for module in registry.modules() {
            Self::validate_descriptor(module)?;
        }
        for block in registry.settings_blocks() {
            for (name, value) in [("class_name", &block.class_name), ("field", &block.field)] {
                if !PYTHON_IDENT.is_match(value) {
                    return Err(DomainError::InvalidCatalog {
                        path: format!("settings_blocks.{}.{}", block.id, name),
                        reason: "expected a Python identifier".into(),
                    });
                }
            }
            if !block
                .definition
                .trim_start()
                .starts_with(&format!("class {}", block.class_name))
            {
                return Err(DomainError::InvalidCatalog {
                    path: format!("settings_blocks.{}.definition", block.id),
                    reason: format!("must define 'class {}'", block.class_name),
                });
            }
        }
        for common in registry.commons() {
            if common.files.is_empty() {
                return Err(DomainError::InvalidCatalog {
                    path: format!("common.{}.files", common.id),
                    reason: "bundle has no files".into(),
                });
            }
        }
        Ok(())
    }
}
