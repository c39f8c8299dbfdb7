pub mod common;
pub mod descriptor;
pub mod project_layout;
pub mod registry;
pub mod report;

pub use crate::domain::DomainError;
pub use descriptor::{
    CommonBundle, EnvSection, ModuleDescriptor, RouteRegistration, RuntimePackage, SettingsBlock,
};
pub use project_layout::ProjectLayout;
pub use registry::Registry;
pub use report::{
    BatchCounts, BatchReport, ChangeOutcome, FileChange, InstallReport, InstallStatus, ModuleState,
    RemoveReport,
};
