//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports: load a catalog, install
//! modules, remove them and initialize a new project.

pub mod installer;
pub mod materializer;
pub mod project_service;
pub mod registry_service;

pub use installer::{InstallOptions, Installer};
pub use materializer::{MaterializeStatus, Materialized, Materializer};
pub use project_service::{InitRequest, ProjectInitializer};
pub use registry_service::RegistryManager;
