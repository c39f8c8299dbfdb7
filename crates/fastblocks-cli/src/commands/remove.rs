//! `fastblocks remove <module>`

use tracing::{info, instrument};

use fastblocks_core::error::BlocksError;

use crate::{
    cli::{GlobalArgs, RemoveArgs},
    commands::installer,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[instrument(skip_all, fields(module = %args.module))]
pub fn execute(
    args: RemoveArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let installer = installer(&global, &config)?;
    let module = installer.registry().lookup(&args.module)?;
    let dir = installer
        .layout()
        .module_dir(&module.id)
        .map_err(BlocksError::from)?;

    let assume_yes = args.yes || config.install.assume_yes || global.quiet || output.is_json();
    if !assume_yes {
        output.warning(&format!(
            "This will delete {} and everything in it.",
            args.project_path.join(dir.as_path()).display()
        ))?;
        if !output.confirm("Continue?", false)? {
            return Err(CliError::Cancelled);
        }
    }

    let report = installer.remove(&args.module, &args.project_path, !args.keep_registration)?;
    info!(dir = %report.removed_dir, unregistered = report.unregistered, "Module removed");

    if output.is_json() {
        output.json(&report)?;
        return Ok(());
    }

    output.success(&format!("Module '{}' removed ({})", report.module, report.removed_dir))?;
    if report.unregistered {
        output.info(&format!(
            "Router registration removed from {}",
            installer.layout().route_file
        ))?;
    }
    for detail in &report.details {
        output.warning(detail)?;
    }

    output.print("")?;
    output.print("Left in place (remove by hand if nothing else needs them):")?;
    if args.keep_registration {
        output.print(&format!(
            "  \u{2022} router registration in {}",
            installer.layout().route_file
        ))?;
    }
    output.print(&format!("  \u{2022} packages in {}", installer.layout().manifest_file))?;
    output.print(&format!("  \u{2022} variables in {}", installer.layout().env_file))?;
    output.print(&format!("  \u{2022} settings in {}", installer.layout().settings_file))?;
    Ok(())
}
