//! Catalog document → domain [`Registry`].
//!
//! ```json
//! {
//!   "modules": {
//!     "auth": {
//!       "name": "Authentication",
//!       "description": "JWT login and registration",
//!       "version": "1.0.0",
//!       "path": "modules/auth",
//!       "dependencies": ["pyjwt>=2.8"],
//!       "env": { "section": "Auth", "variables": { "JWT_SECRET": "change-me" } },
//!       "router_prefix": "/auth",
//!       "tags": ["auth"]
//!     }
//!   },
//!   "common": { "pagination": { "files": ["pagination.py"] } },
//!   "settings_blocks": { "auth": { "class_name": "AuthSettings", "field": "auth", "definition": "..." } }
//! }
//! ```
//!
//! Every structural error names the offending field, e.g.
//! `modules.auth.router_prefix: expected string, found number`.

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use fastblocks_core::domain::{
    CommonBundle, DomainError, EnvSection, ModuleDescriptor, Registry, RelativePath,
    RouteRegistration, RuntimePackage, SettingsBlock,
};

use super::node::{Field, Node, Table};

/// Directories never copied when a manifest is expanded from disk.
const SKIPPED_DIRS: &[&str] = &["__pycache__", ".mypy_cache", ".pytest_cache"];

pub(crate) fn build_registry(root: &Path, doc: &Node) -> Result<Registry, DomainError> {
    let top = Table::new("", Field::new("catalog", doc).table()?);
    if top.get("modules").is_none() {
        return Err(DomainError::InvalidCatalog {
            path: "modules".into(),
            reason: "missing required field".into(),
        });
    }

    let modules_table = top.table("modules")?;
    let mut modules = Vec::with_capacity(modules_table.entries.len());
    for (id, node) in modules_table.entries {
        let path = modules_table.child_path(id);
        let table = Table::new(path.clone(), Field::new(path, node).table()?);
        modules.push(module(root, id, &table)?);
    }

    let common_table = top.table("common")?;
    let mut commons = Vec::with_capacity(common_table.entries.len());
    for (id, node) in common_table.entries {
        let path = common_table.child_path(id);
        let table = Table::new(path.clone(), Field::new(path, node).table()?);
        commons.push(common(root, id, &table)?);
    }

    let blocks_table = top.table("settings_blocks")?;
    let mut blocks = Vec::with_capacity(blocks_table.entries.len());
    for (id, node) in blocks_table.entries {
        let path = blocks_table.child_path(id);
        let table = Table::new(path.clone(), Field::new(path, node).table()?);
        blocks.push(SettingsBlock {
            id: id.clone(),
            class_name: table.required_string("class_name")?,
            field: table.required_string("field")?,
            imports: table.strings("imports")?,
            definition: table.required_string("definition")?,
        });
    }

    check_references(&modules, &commons, &blocks)?;

    debug!(
        modules = modules.len(),
        common = commons.len(),
        settings_blocks = blocks.len(),
        "catalog parsed"
    );
    Registry::new(root, modules, commons, blocks)
}

/// Every id a module points at must be declared somewhere in the catalog.
fn check_references(
    modules: &[ModuleDescriptor],
    commons: &[CommonBundle],
    blocks: &[SettingsBlock],
) -> Result<(), DomainError> {
    for module in modules {
        dangling(module, "module_dependencies", &module.module_dependencies, "modules", |id| {
            modules.iter().any(|m| m.id == id)
        })?;
        dangling(module, "common_dependencies", &module.common_dependencies, "common", |id| {
            commons.iter().any(|c| c.id == id)
        })?;
        dangling(module, "config_dependencies", &module.config_dependencies, "settings_blocks", |id| {
            blocks.iter().any(|b| b.id == id)
        })?;
    }
    Ok(())
}

fn dangling(
    module: &ModuleDescriptor,
    key: &str,
    ids: &[String],
    section: &str,
    declared: impl Fn(&str) -> bool,
) -> Result<(), DomainError> {
    match ids.iter().position(|id| !declared(id)) {
        Some(i) => Err(DomainError::InvalidCatalog {
            path: format!("modules.{}.{}[{}]", module.id, key, i),
            reason: format!("'{}' is not declared under `{}`", ids[i], section),
        }),
        None => Ok(()),
    }
}

fn module(root: &Path, id: &str, t: &Table<'_>) -> Result<ModuleDescriptor, DomainError> {
    let source_path = relative(t, "path", &t.required_string("path")?)?;
    let file_manifest = manifest(root, t, &source_path)?;

    Ok(ModuleDescriptor {
        id: id.to_string(),
        name: t.required_string("name")?,
        description: t.required_string("description")?,
        version: t.required_string("version")?,
        source_path,
        file_manifest,
        runtime_packages: t
            .strings("dependencies")?
            .iter()
            .map(|s| RuntimePackage::parse(s))
            .collect(),
        module_dependencies: t.strings("module_dependencies")?,
        common_dependencies: t.strings("common_dependencies")?,
        config_dependencies: t.strings("config_dependencies")?,
        environment: environment(t)?,
        route: RouteRegistration {
            prefix: t.required_string("router_prefix")?,
            tags: t.strings("tags")?,
            optional: t.boolean("optional")?,
        },
        author: t.optional_string("author")?,
        repository: t.optional_string("repository")?,
        python_version: t.optional_string("python_version")?,
    })
}

fn common(root: &Path, id: &str, t: &Table<'_>) -> Result<CommonBundle, DomainError> {
    let path = t
        .optional_string("path")?
        .unwrap_or_else(|| format!("common/{}", id));
    let source_path = relative(t, "path", &path)?;
    let files = manifest(root, t, &source_path)?;
    Ok(CommonBundle {
        id: id.to_string(),
        description: t.optional_string("description")?.unwrap_or_default(),
        source_path,
        files,
    })
}

/// `env` is either `{ section, variables: {..} }` or a flat `{ KEY: default }`.
fn environment(t: &Table<'_>) -> Result<EnvSection, DomainError> {
    let env = t.table("env")?;
    let (section, variables) = if env.get("variables").is_some() {
        (env.optional_string("section")?.unwrap_or_default(), env.table("variables")?)
    } else {
        (String::new(), env)
    };
    let variables = variables
        .entries
        .iter()
        .map(|(key, node)| {
            let value = Field::new(variables.child_path(key), node).scalar()?;
            Ok((key.clone(), value))
        })
        .collect::<Result<Vec<_>, DomainError>>()?;
    Ok(EnvSection { section, variables })
}

fn relative(t: &Table<'_>, key: &str, value: &str) -> Result<RelativePath, DomainError> {
    RelativePath::try_new(value).map_err(|e| DomainError::InvalidCatalog {
        path: t.child_path(key),
        reason: e.to_string(),
    })
}

/// Explicit `files`, or every file under the source directory.
fn manifest(
    root: &Path,
    t: &Table<'_>,
    source_path: &RelativePath,
) -> Result<Vec<RelativePath>, DomainError> {
    if t.get("files").is_some() {
        let path = t.child_path("files");
        return t
            .strings("files")?
            .iter()
            .enumerate()
            .map(|(i, f)| {
                RelativePath::try_new(f).map_err(|e| DomainError::InvalidCatalog {
                    path: format!("{}[{}]", path, i),
                    reason: e.to_string(),
                })
            })
            .collect();
    }

    let dir = root.join(source_path.as_path());
    let error = |reason: String| DomainError::InvalidCatalog {
        path: t.child_path("path"),
        reason,
    };
    if !dir.is_dir() {
        return Err(error(format!(
            "no `files` listed and {} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && SKIPPED_DIRS.iter().any(|s| e.file_name() == *s))
        });
    for entry in walker {
        let entry = entry.map_err(|e| error(format!("failed to walk {}: {e}", dir.display())))?;
        if !entry.file_type().is_file() || entry.path().extension().is_some_and(|x| x == "pyc") {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&dir) else {
            continue;
        };
        files.push(RelativePath::try_new(rel).map_err(|e| error(e.to_string()))?);
    }
    debug!(dir = %dir.display(), files = files.len(), "expanded file manifest");
    Ok(files)
}
