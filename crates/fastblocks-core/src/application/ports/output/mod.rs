//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `fastblocks-adapters` crate provides implementations.

use std::path::{Path, PathBuf};

use crate::domain::Registry;
use crate::error::BlocksResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `fastblocks_adapters::filesystem::LocalFilesystem` (production)
/// - `fastblocks_adapters::filesystem::MemoryFilesystem` (testing)
///
/// `write_file` must be atomic: readers see the old content or the new
/// content, never a partial file.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> BlocksResult<()>;

    fn read_to_string(&self, path: &Path) -> BlocksResult<String>;

    fn read(&self, path: &Path) -> BlocksResult<Vec<u8>>;

    /// Atomically replace (or create) a file. Parent directories must exist.
    fn write_file(&self, path: &Path, content: &[u8]) -> BlocksResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> BlocksResult<()>;

    /// Direct children of a directory, sorted.
    fn list_dir(&self, path: &Path) -> BlocksResult<Vec<PathBuf>>;
}

/// Port for loading the module catalog.
///
/// Implemented by `fastblocks_adapters::catalog::JsonCatalog` and
/// `fastblocks_adapters::catalog::TomlCatalog`.
pub trait CatalogSource: Send + Sync {
    /// Parse and structurally validate the catalog.
    fn load(&self) -> BlocksResult<Registry>;

    /// Human-readable origin, for messages and logs.
    fn describe(&self) -> String;
}

/// One skeleton file, with `{placeholder}` markers still in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonFile {
    /// Project-relative, forward-slash path.
    pub path: String,
    pub content: String,
}

/// Port for the project skeleton used by `init`.
///
/// Implemented by `fastblocks_adapters::skeleton::BuiltinSkeleton` and
/// `fastblocks_adapters::skeleton::DirectorySkeleton`.
pub trait SkeletonStore: Send + Sync {
    fn files(&self) -> BlocksResult<Vec<SkeletonFile>>;
}
