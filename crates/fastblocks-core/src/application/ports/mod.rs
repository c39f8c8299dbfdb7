//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `fastblocks-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations against the target project and registry
//!   - `CatalogSource`: Registry catalog loading
//!   - `SkeletonStore`: Project skeleton files for `init`

pub mod output;

pub use output::{CatalogSource, Filesystem, SkeletonFile, SkeletonStore};

#[cfg(test)]
pub use output::MockFilesystem;
