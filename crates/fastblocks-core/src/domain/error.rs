// ============================================================================
// domain/error.rs - INSTALLATION ENGINE ERROR DOMAIN
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (batch reports keep a copy per module)
/// - Categorizable (for CLI display and exit codes)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Catalog Errors (the whole registry is rejected)
    // ========================================================================
    #[error("Invalid registry catalog at '{path}': {reason}")]
    InvalidCatalog { path: String, reason: String },

    #[error("Duplicate module id '{id}' in registry catalog")]
    DuplicateModule { id: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes its root: {path}")]
    PathEscapesRoot { path: String },

    // ========================================================================
    // Not Found Errors (404-level equivalent)
    // ========================================================================
    #[error("Module '{id}' not found in registry")]
    ModuleNotFound { id: String },

    #[error("Common bundle '{id}' not found in registry")]
    CommonBundleNotFound { id: String },

    #[error("Settings block '{id}' not found in registry")]
    SettingsBlockNotFound { id: String },

    #[error("Module '{module}' depends on '{missing}', which is not in the registry")]
    UnknownDependency { module: String, missing: String },

    // ========================================================================
    // Dependency Errors
    // ========================================================================
    #[error("Cyclic module dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Module '{module}' requires '{missing}', which is not installed")]
    MissingDependency { module: String, missing: String },

    // ========================================================================
    // Mutation Errors (fatal for one file only)
    // ========================================================================
    #[error("Cannot parse {file}: {reason}")]
    Parse { file: String, reason: String },

    // ========================================================================
    // Constraint Violations
    // ========================================================================
    #[error("Invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },
}

impl DomainError {
    /// Build a parse error for a named aggregator file.
    pub fn parse(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidCatalog { path, .. } => vec![
                format!("Fix the catalog entry at '{}'", path),
                "Nothing was installed; the whole catalog was rejected".into(),
            ],
            Self::DuplicateModule { id } => vec![
                format!("Module id '{}' is declared more than once", id),
                "Module ids must be unique within registry.json".into(),
            ],
            Self::ModuleNotFound { .. } => vec![
                "Try: fastblocks list to see available modules".into(),
                "Or search: fastblocks list --search <text>".into(),
            ],
            Self::CommonBundleNotFound { id } | Self::SettingsBlockNotFound { id } => vec![
                format!("The registry references '{}' but does not define it", id),
                "The registry catalog may be corrupted".into(),
            ],
            Self::UnknownDependency { module, missing } => vec![
                format!("Declare '{}' in the registry or drop it from '{}'", missing, module),
                "The registry catalog may be corrupted".into(),
            ],
            Self::CyclicDependency { cycle } => vec![
                format!("Break the cycle between: {}", cycle.join(", ")),
                "module_dependencies must form an acyclic graph".into(),
            ],
            Self::MissingDependency { missing, .. } => vec![
                format!("Install the prerequisite first: fastblocks add {}", missing),
                "Or drop --no-deps to install prerequisites automatically".into(),
            ],
            Self::Parse { file, .. } => vec![
                format!("{} does not have the expected structure", file),
                "The file was left untouched; wire the module manually".into(),
            ],
            Self::InvalidProjectName { .. } => vec![
                "Start with a letter; use letters, digits, '_' or '-'".into(),
                "Examples: my-api, shop_backend, service2".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCatalog { .. }
            | Self::DuplicateModule { .. }
            | Self::AbsolutePathNotAllowed { .. }
            | Self::PathEscapesRoot { .. }
            | Self::UnknownDependency { .. } => ErrorCategory::Catalog,
            Self::ModuleNotFound { .. }
            | Self::CommonBundleNotFound { .. }
            | Self::SettingsBlockNotFound { .. } => ErrorCategory::NotFound,
            Self::CyclicDependency { .. } | Self::MissingDependency { .. } => {
                ErrorCategory::Dependency
            }
            Self::Parse { .. } => ErrorCategory::Parse,
            Self::InvalidProjectName { .. } => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Catalog,
    Dependency,
    NotFound,
    Parse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_lists_members_in_order() {
        let err = DomainError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic module dependency: a -> b -> a");
    }

    #[test]
    fn missing_dependency_suggests_add() {
        let err = DomainError::MissingDependency {
            module: "users".into(),
            missing: "auth".into(),
        };
        assert!(err.suggestions().iter().any(|s| s.contains("fastblocks add auth")));
        assert_eq!(err.category(), ErrorCategory::Dependency);
    }

    #[test]
    fn unknown_dependency_blames_the_registry() {
        let err = DomainError::UnknownDependency {
            module: "b".into(),
            missing: "ghost".into(),
        };
        assert_eq!(
            err.to_string(),
            "Module 'b' depends on 'ghost', which is not in the registry"
        );
        assert_eq!(err.category(), ErrorCategory::Catalog);
    }
}
