//! Application layer for fastblocks.
//!
//! This layer contains:
//! - **Services**: use case orchestration (`Installer`, `RegistryManager`, `ProjectInitializer`)
//! - **Ports**: traits for the filesystem, catalog and skeleton
//! - **Errors**: orchestration and I/O failures
//!
//! Business rules live in `crate::domain`; this layer only sequences them.

pub mod error;
pub mod ports;
pub mod services;

pub use services::{
    InitRequest, InstallOptions, Installer, MaterializeStatus, Materialized, Materializer,
    ProjectInitializer, RegistryManager,
};

pub use ports::{CatalogSource, Filesystem, SkeletonFile, SkeletonStore};

pub use error::ApplicationError;
