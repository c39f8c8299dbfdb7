//! `fastblocks status`

use fastblocks_core::domain::ModuleState;

use crate::{
    cli::{GlobalArgs, StatusArgs},
    commands::installer,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(
    args: StatusArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let installer = installer(&global, &config)?;
    let states = installer.status(&args.project_path)?;

    if output.is_json() {
        output.json(&states)?;
        return Ok(());
    }

    let installed = states.iter().filter(|s| s.is_installed()).count();
    output.header(&format!(
        "{} of {} registry module(s) installed in {}",
        installed,
        states.len(),
        args.project_path.display()
    ))?;
    output.print("")?;

    let width = states
        .iter()
        .map(|s| s.module.chars().count())
        .chain(std::iter::once("MODULE".len()))
        .max()
        .unwrap_or(0);
    output.print(&format!("  {:width$}  STATE", "MODULE"))?;
    for state in &states {
        let line = format!("  {:width$}  {}", state.module, label(state));
        if state.files_present || state.registered {
            output.print(&line)?;
        } else {
            output.dim(&line)?;
        }
    }
    Ok(())
}

fn label(state: &ModuleState) -> &'static str {
    match (state.files_present, state.registered) {
        (true, true) => "installed",
        (true, false) => "files present, router not registered",
        (false, true) => "registered, files missing",
        (false, false) => "-",
    }
}
