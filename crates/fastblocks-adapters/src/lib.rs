//! Infrastructure adapters for fastblocks.
//!
//! This crate implements the ports defined in `fastblocks-core::application::ports`.
//! It owns every external dependency and all real I/O.

pub mod catalog;
pub mod filesystem;
pub mod registry_locator;
pub mod skeleton;

// Re-export commonly used adapters
pub use catalog::{CatalogFormat, JsonCatalog, TomlCatalog, open_catalog};
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use registry_locator::{RegistryLocation, RegistryLocator, RegistryOrigin};
pub use skeleton::{BuiltinSkeleton, DirectorySkeleton, generate_secret_key};
