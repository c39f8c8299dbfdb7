//! fastblocks Core - module installation engine
//!
//! This crate provides the domain and application layers for installing
//! self-contained FastAPI feature modules into an existing project tree,
//! following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          fastblocks-cli (CLI)           │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (RegistryManager, Installer, ...)      │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Filesystem, CatalogSource, Skeleton)   │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   fastblocks-adapters (Infrastructure)  │
//! │ (LocalFilesystem, JsonCatalog, etc)     │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (Registry, Resolver, SourceMutators)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fastblocks_core::prelude::*;
//! # fn demo(catalog: &dyn CatalogSource, fs: Box<dyn Filesystem>) -> BlocksResult<()> {
//! let registry = RegistryManager::load(catalog)?;
//! let installer = Installer::new(registry, fs, ProjectLayout::default());
//! let report = installer.install("users", "./my-api".as_ref(), &InstallOptions::default())?;
//! println!("{}", report.status);
//! # Ok(())
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

pub mod prelude {
    pub use crate::application::{
        InitRequest, InstallOptions, Installer, Materializer, ProjectInitializer, RegistryManager,
        ports::{CatalogSource, Filesystem, SkeletonStore},
    };
    pub use crate::domain::{
        BatchReport, InstallReport, InstallStatus, ModuleDescriptor, ModuleState, ProjectLayout,
        Registry, ResolveTarget,
    };
    pub use crate::error::{BlocksError, BlocksResult};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
