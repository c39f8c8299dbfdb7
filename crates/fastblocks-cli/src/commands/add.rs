//! `fastblocks add` - install one module, several, or the whole registry.
//!
//! One id surfaces the first fatal error. Several ids (or `--all`) run as a
//! batch: each module gets its own outcome and the exit code is 5 when any
//! of them did not end up usable.

use tracing::{info, instrument};

use fastblocks_core::{
    application::{InstallOptions, Installer},
    domain::{BatchReport, ChangeOutcome, InstallReport, InstallStatus, ResolveTarget},
};

use crate::{
    cli::{AddArgs, GlobalArgs},
    commands::installer,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[instrument(skip_all, fields(modules = ?args.modules, all = args.all))]
pub fn execute(
    args: AddArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let installer = installer(&global, &config)?;
    let options = InstallOptions {
        force: args.force,
        dry_run: args.dry_run,
        resolve_dependencies: !args.no_deps && config.install.resolve_dependencies,
    };
    let target = if args.all {
        ResolveTarget::All
    } else if let [id] = args.modules.as_slice() {
        ResolveTarget::One(id.clone())
    } else {
        ResolveTarget::Many(args.modules.clone())
    };

    let assume_yes =
        args.yes || config.install.assume_yes || args.dry_run || global.quiet || output.is_json();
    if !assume_yes {
        show_plan(&installer, &target, &options, &output)?;
        if !output.confirm("Continue?", true)? {
            return Err(CliError::Cancelled);
        }
    }

    let root = args.project_path.as_path();
    let spinner = output.spinner("Installing modules...");
    match target {
        ResolveTarget::One(id) => {
            let report = installer.install(&id, root, &options)?;
            drop(spinner);
            info!(module = %report.module, status = %report.status, "Install finished");

            if output.is_json() {
                output.json(&report)?;
            } else {
                for prerequisite in &report.prerequisites {
                    render(prerequisite, &output)?;
                }
                render(&report, &output)?;
            }
            let all: Vec<&InstallReport> =
                report.prerequisites.iter().chain(std::iter::once(&report)).collect();
            let failed = all.iter().filter(|r| !r.status.is_success()).count();
            if failed > 0 {
                return Err(CliError::InstallIncomplete {
                    failed,
                    total: all.len(),
                });
            }
            next_steps(&installer, &all, &options, &output)?;
        }
        target => {
            let batch = match &target {
                ResolveTarget::Many(ids) => installer.install_many(ids, root, &options)?,
                _ => installer.install_all(root, &options)?,
            };
            drop(spinner);
            report_batch(&installer, &batch, &options, &output)?;
        }
    }
    Ok(())
}

fn report_batch(
    installer: &Installer,
    batch: &BatchReport,
    options: &InstallOptions,
    output: &OutputManager,
) -> CliResult<()> {
    let counts = batch.counts();
    info!(
        installed = counts.installed,
        skipped = counts.skipped,
        failed = counts.failed,
        "Batch finished"
    );

    if output.is_json() {
        output.json(batch)?;
    } else {
        for report in &batch.reports {
            render(report, output)?;
        }
        output.print("")?;
        output.header(&format!(
            "{} installed, {} skipped, {} failed",
            counts.installed, counts.skipped, counts.failed
        ))?;
    }

    if !batch.is_complete() {
        return Err(CliError::InstallIncomplete {
            failed: counts.failed,
            total: batch.reports.len(),
        });
    }
    let reports: Vec<&InstallReport> = batch.reports.iter().collect();
    next_steps(installer, &reports, options, output)
}

fn show_plan(
    installer: &Installer,
    target: &ResolveTarget,
    options: &InstallOptions,
    output: &OutputManager,
) -> CliResult<()> {
    let order = installer.registry().resolve(target)?;
    if let ResolveTarget::One(id) = target {
        let module = installer.registry().lookup(id)?;
        output.header(&format!("Adding module: {}", module.name))?;
        output.dim(&module.description)?;
    } else {
        output.header(&format!("Adding {} module(s)", order.len()))?;
    }
    if order.len() > 1 {
        let ids: Vec<&str> = order.iter().map(|m| m.id.as_str()).collect();
        output.print(&format!("Install order: {}", ids.join(" \u{2192} ")))?;
        if !options.resolve_dependencies {
            output.dim("Prerequisites are not installed automatically (--no-deps).")?;
        }
    }
    output.print("")?;
    Ok(())
}

fn render(report: &InstallReport, output: &OutputManager) -> CliResult<()> {
    let prefix = if report.dry_run { "[dry run] " } else { "" };
    let line = format!("{prefix}{}: {}", report.module, describe(report.status));
    match report.status {
        InstallStatus::Installed => output.success(&line)?,
        InstallStatus::Skipped => output.info(&line)?,
        InstallStatus::PartialFailure => output.warning(&line)?,
        InstallStatus::DependencyMissing | InstallStatus::Failed => output.error(&line)?,
    }

    for change in report.written() {
        let verb = match (report.dry_run, change.outcome) {
            (true, ChangeOutcome::Created) => "would create",
            (true, _) => "would update",
            (false, ChangeOutcome::Created) => "created",
            (false, _) => "updated",
        };
        output.dim(&format!("    {verb:<12} {}", change.path))?;
    }
    if output.is_verbose() {
        for change in report.changes.iter().filter(|c| {
            matches!(c.outcome, ChangeOutcome::Unchanged | ChangeOutcome::Skipped)
        }) {
            output.dim(&format!("    {:<12} {}", change.outcome.as_str(), change.path))?;
        }
    }
    for change in report.changes.iter().filter(|c| c.outcome == ChangeOutcome::Failed) {
        output.warning(&format!("    not updated: {}", change.path))?;
    }
    for detail in &report.details {
        output.print(&format!("    {detail}"))?;
    }
    Ok(())
}

fn describe(status: InstallStatus) -> &'static str {
    match status {
        InstallStatus::Installed => "installed",
        InstallStatus::Skipped => "already installed, skipped",
        InstallStatus::DependencyMissing => "prerequisite missing",
        InstallStatus::PartialFailure => "installed, but some files need manual wiring",
        InstallStatus::Failed => "failed",
    }
}

fn next_steps(
    installer: &Installer,
    reports: &[&InstallReport],
    options: &InstallOptions,
    output: &OutputManager,
) -> CliResult<()> {
    if options.dry_run {
        output.print("")?;
        output.info("Dry run: nothing was written.")?;
        return Ok(());
    }
    if !reports.iter().any(|r| r.status == InstallStatus::Installed) {
        return Ok(());
    }

    let layout = installer.layout();
    let needs_env = reports.iter().any(|r| {
        installer
            .registry()
            .lookup(&r.module)
            .is_ok_and(|m| !m.environment.is_empty())
    });

    output.print("")?;
    output.print("Next steps:")?;
    output.print(&format!("  \u{2022} pip install -r {}", layout.manifest_file))?;
    if needs_env {
        output.print(&format!(
            "  \u{2022} review the new variables in {}",
            layout.env_file
        ))?;
    }
    output.print("  \u{2022} run database migrations if the module defines models")?;
    output.print("  \u{2022} uvicorn main:app --reload")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_usable_statuses_read_as_installed() {
        assert_eq!(describe(InstallStatus::Installed), "installed");
        assert!(describe(InstallStatus::PartialFailure).contains("manual"));
        assert_eq!(describe(InstallStatus::DependencyMissing), "prerequisite missing");
    }
}
