//! `fastblocks info <module>`

use serde_json::json;

use crate::{
    cli::{InfoArgs, global::GlobalArgs},
    commands::open_registry,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(
    args: InfoArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let registry = open_registry(&global, &config)?;
    let module = registry.lookup(&args.module)?;
    let required_by: Vec<&str> = registry
        .dependents(&module.id)
        .into_iter()
        .map(|m| m.id.as_str())
        .collect();

    if output.is_json() {
        output.json(&json!({
            "module": module,
            "required_by": required_by,
        }))?;
        return Ok(());
    }

    output.header(&format!("{} ({})", module.name, module.id))?;
    output.dim(&module.description)?;
    output.print("")?;

    let row = |label: &str, value: &str| output.print(&format!("  {:<22}{}", label, value));
    let joined = |items: &[String]| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };

    row("Version", &module.version)?;
    row("Router prefix", &module.route.prefix)?;
    row("Tags", &joined(&module.route.tags))?;
    if module.route.optional {
        row("Router", "optional (registered inside try/except ImportError)")?;
    }
    row("Requires modules", &joined(&module.module_dependencies))?;
    row("Required by", &joined(&required_by.iter().map(|s| s.to_string()).collect::<Vec<_>>()))?;
    row("Common code", &joined(&module.common_dependencies))?;
    row("Settings", &joined(&module.config_dependencies))?;
    if let Some(python) = &module.python_version {
        row("Python", python)?;
    }
    if let Some(author) = &module.author {
        row("Author", author)?;
    }
    if let Some(repository) = &module.repository {
        row("Repository", repository)?;
    }

    if !module.runtime_packages.is_empty() {
        output.print("")?;
        output.print("  Python packages:")?;
        for package in &module.runtime_packages {
            output.print(&format!("    \u{2022} {}", package.requirement_line()))?;
        }
    }

    if !module.environment.is_empty() {
        output.print("")?;
        match module.environment.section.as_str() {
            "" => output.print("  Environment variables:")?,
            section => output.print(&format!("  Environment variables ({section}):"))?,
        }
        for (key, default) in &module.environment.variables {
            output.print(&format!("    {key}={default}"))?;
        }
    }

    output.print("")?;
    output.print(&format!("  Files ({}):", module.file_manifest.len()))?;
    for file in &module.file_manifest {
        output.dim(&format!("    {}", file.to_slash()))?;
    }
    output.print("")?;
    output.info(&format!("Install with: fastblocks add {}", module.id))?;
    Ok(())
}
