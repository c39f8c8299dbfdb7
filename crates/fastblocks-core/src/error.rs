//! Unified error handling for fastblocks Core.
//!
//! Wraps domain and application errors in one root type with
//! user-actionable suggestions and a display category.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for fastblocks Core operations.
#[derive(Debug, Error, Clone)]
pub enum BlocksError {
    /// Errors from the domain layer (catalog, dependency graph, parsing).
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (filesystem, orchestration).
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl BlocksError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check your setup and try again".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in fastblocks".into(),
                "Please report this issue at: https://github.com/fastblocks/fastblocks/issues"
                    .into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Catalog => ErrorCategory::Configuration,
                crate::domain::ErrorCategory::Dependency => ErrorCategory::Dependency,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Parse => ErrorCategory::Validation,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the domain error, if this wraps one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Dependency,
    NotFound,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type BlocksResult<T> = Result<T, BlocksError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> BlocksResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> BlocksResult<T> {
        self.map_err(|e| BlocksError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_message() {
        let err: BlocksError = DomainError::ModuleNotFound { id: "ghost".into() }.into();
        assert_eq!(err.to_string(), "Module 'ghost' not found in registry");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.as_domain().is_some());
    }

    #[test]
    fn catalog_errors_are_configuration() {
        let err: BlocksError = DomainError::DuplicateModule { id: "auth".into() }.into();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn context_wraps_as_internal() {
        let res: Result<(), std::io::Error> =
            Err(std::io::Error::other("boom"));
        let err = res.context("reading state").unwrap_err();
        assert!(matches!(err, BlocksError::Internal { .. }));
        assert!(err.to_string().contains("reading state: boom"));
    }
}
