//! `fastblocks init` - write a FastAPI project skeleton.

use std::path::{Component, Path};

use serde_json::json;
use tracing::{info, instrument};

use fastblocks_adapters::{BuiltinSkeleton, DirectorySkeleton, LocalFilesystem, generate_secret_key};
use fastblocks_core::application::{InitRequest, ProjectInitializer, SkeletonStore};

use crate::{
    cli::{GlobalArgs, InitArgs},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

#[instrument(skip_all, fields(path = %args.project_path.display()))]
pub fn execute(
    args: InitArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let root = std::path::absolute(&args.project_path)
        .with_cli_context(|| format!("cannot resolve {}", args.project_path.display()))?;
    let name = match args.name {
        Some(name) => name,
        None => default_name(&root)?,
    };

    output.header("Initializing FastAPI project")?;
    output.dim(&format!("Location: {}", root.display()))?;
    output.dim(&format!("Name:     {name}"))?;
    output.print("")?;

    let non_empty = std::fs::read_dir(&root).is_ok_and(|mut entries| entries.next().is_some());
    if non_empty && args.force {
        output.warning("Directory is not empty; skeleton files will overwrite existing ones.")?;
        let assume_yes = args.yes || config.install.assume_yes || global.quiet || output.is_json();
        if !assume_yes && !output.confirm("Continue?", false)? {
            return Err(CliError::Cancelled);
        }
    }

    let skeleton: Box<dyn SkeletonStore> = match &args.skeleton {
        Some(dir) => Box::new(DirectorySkeleton::new(dir.clone())),
        None => Box::new(BuiltinSkeleton::new()),
    };
    let initializer = ProjectInitializer::new(Box::new(LocalFilesystem::new()), skeleton);
    let request = InitRequest {
        name: name.clone(),
        description: args.description,
        secret_key: generate_secret_key(),
    };
    let files = initializer.init(&root, &request, args.force)?;
    info!(project = %name, files = files.len(), "Project initialized");

    if output.is_json() {
        output.json(&json!({ "project": name, "path": root, "files": files }))?;
        return Ok(());
    }

    output.success("Project initialized successfully!")?;
    output.print("")?;
    output.print("Created files:")?;
    for file in &files {
        output.dim(&format!("  \u{2022} {file}"))?;
    }

    output.print("")?;
    output.print("Next steps:")?;
    if root != std::env::current_dir().unwrap_or_default() {
        output.print(&format!("  cd {}", args.project_path.display()))?;
    }
    output.print("  1. Review .env and set your own values")?;
    output.print("  2. python -m venv .venv && source .venv/bin/activate")?;
    output.print("  3. pip install -r requirements.txt")?;
    output.print("  4. fastblocks list, then fastblocks add <module>")?;
    output.print("  5. uvicorn main:app --reload")?;
    Ok(())
}

/// Directory name of the project root.
fn default_name(root: &Path) -> CliResult<String> {
    root.components()
        .rev()
        .find_map(|c| match c {
            Component::Normal(n) => n.to_str(),
            _ => None,
        })
        .map(str::to_string)
        .ok_or_else(|| CliError::InvalidInput {
            message: format!(
                "cannot derive a project name from {}; pass --name",
                root.display()
            ),
        })
}
