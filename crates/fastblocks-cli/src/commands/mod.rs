//! Subcommand handlers. Each translates arguments into service calls and
//! renders the result; no installation logic lives here.

pub mod add;
pub mod completions;
pub mod config;
pub mod info;
pub mod init;
pub mod list;
pub mod remove;
pub mod status;

use tracing::debug;

use fastblocks_adapters::{LocalFilesystem, RegistryLocator, open_catalog};
use fastblocks_core::application::{Installer, RegistryManager};

use crate::{cli::GlobalArgs, config::AppConfig, error::CliResult};

/// Locate and load the registry: `--registry`, then the environment, then
/// config, then discovery.
pub(crate) fn open_registry(global: &GlobalArgs, config: &AppConfig) -> CliResult<RegistryManager> {
    let location = RegistryLocator::from_env()
        .with_flag(global.registry.clone())
        .with_config(config.registry.path.clone())
        .locate()?;
    debug!(path = %location.path.display(), origin = %location.origin, "Using registry");

    let catalog = open_catalog(&location.path)?;
    Ok(RegistryManager::load(catalog.as_ref())?)
}

pub(crate) fn installer(global: &GlobalArgs, config: &AppConfig) -> CliResult<Installer> {
    Ok(Installer::new(
        open_registry(global, config)?,
        Box::new(LocalFilesystem::new()),
        config.layout.clone(),
    ))
}
