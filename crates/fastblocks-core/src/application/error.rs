//! Application layer errors.
//!
//! These errors represent failures in orchestration and I/O, not business
//! logic. Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Target project directory does not exist.
    #[error("Project directory not found: {path}")]
    ProjectNotFound { path: PathBuf },

    /// A file listed in a module manifest is missing from the registry.
    #[error("Registry files for module '{module}' are missing: {path}")]
    ModuleSourceMissing { module: String, path: PathBuf },

    /// `remove` on a module whose directory is absent.
    #[error("Module '{module}' is not installed in this project")]
    ModuleNotInstalled { module: String },

    /// `init` into a directory that already has files.
    #[error("Directory is not empty: {path}")]
    ProjectNotEmpty { path: PathBuf },

    /// Store access failed (lock poisoned).
    #[error("Filesystem store lock poisoned")]
    StoreLockError,

    /// Rollback failed (best-effort cleanup failed).
    #[error("Rollback failed for {path}: {reason}")]
    RollbackFailed { path: PathBuf, reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::ProjectNotFound { path } => vec![
                format!("No directory at {}", path.display()),
                "Create one with: fastblocks init --project-path <dir>".into(),
            ],
            Self::ModuleSourceMissing { .. } => vec![
                "The registry is incomplete; reinstall or point --registry elsewhere".into(),
                "Nothing was written for this module".into(),
            ],
            Self::ModuleNotInstalled { .. } => vec![
                "Try: fastblocks status to see what is installed".into(),
            ],
            Self::ProjectNotEmpty { path } => vec![
                format!("{} already contains files", path.display()),
                "Use --force to write the skeleton anyway".into(),
                "Or choose an empty directory".into(),
            ],
            Self::StoreLockError => vec!["Try again in a moment".into()],
            Self::RollbackFailed { path, .. } => vec![
                format!("Remove {} by hand before retrying", path.display()),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FilesystemError { .. } | Self::RollbackFailed { .. } | Self::StoreLockError => {
                ErrorCategory::Internal
            }
            Self::ProjectNotFound { .. } | Self::ModuleNotInstalled { .. } => {
                ErrorCategory::NotFound
            }
            Self::ModuleSourceMissing { .. } => ErrorCategory::Configuration,
            Self::ProjectNotEmpty { .. } => ErrorCategory::Validation,
        }
    }
}
