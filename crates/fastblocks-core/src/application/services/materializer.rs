//! Materializer - copies a module's file manifest into a project.
//!
//! Reads every source file before writing anything, so a missing file in the
//! registry aborts with the project untouched.

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{ApplicationError, ports::Filesystem},
    domain::{
        ChangeOutcome, DomainError, FileChange, ModuleDescriptor, ProjectLayout, Registry,
        RelativePath,
    },
    error::BlocksResult,
};

/// What `materialize` did with the module directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeStatus {
    Installed,
    SkippedAlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub status: MaterializeStatus,
    pub changes: Vec<FileChange>,
}

/// A file read from the registry, waiting to be written.
struct Staged {
    dest: RelativePath,
    content: Vec<u8>,
    /// Bundle files never overwrite.
    keep_existing: bool,
}

pub struct Materializer<'a> {
    fs: &'a dyn Filesystem,
    registry: &'a Registry,
    layout: &'a ProjectLayout,
}

impl<'a> Materializer<'a> {
    pub fn new(fs: &'a dyn Filesystem, registry: &'a Registry, layout: &'a ProjectLayout) -> Self {
        Self {
            fs,
            registry,
            layout,
        }
    }

    /// Copy `module` (and its common bundles) into `root`.
    ///
    /// - destination exists and `force` is false: module files untouched
    /// - `force`: every manifest file is rewritten
    /// - `dry_run`: outcomes are computed, nothing is written
    #[instrument(skip_all, fields(module = %module.id, force, dry_run))]
    pub fn materialize(
        &self,
        module: &ModuleDescriptor,
        root: &Path,
        force: bool,
        dry_run: bool,
    ) -> BlocksResult<Materialized> {
        let dest_dir = self.layout.module_dir(&module.id)?;
        let already_present = self.fs.exists(&root.join(dest_dir.as_path()));
        let status = if already_present && !force {
            debug!("module directory present, skipping copy");
            MaterializeStatus::SkippedAlreadyPresent
        } else {
            MaterializeStatus::Installed
        };

        let mut staged = Vec::new();
        if status == MaterializeStatus::Installed {
            self.stage_module(module, &dest_dir, &mut staged)?;
        }
        self.stage_commons(module, root, &mut staged)?;
        if !staged.is_empty() {
            self.stage_markers(module, &mut staged)?;
        }

        let changes = self.outcomes(root, &staged)?;
        if dry_run {
            return Ok(Materialized { status, changes });
        }

        match self.write_all(root, &staged, &changes) {
            Ok(()) => {
                info!(files = changes.len(), "Module files materialized");
                Ok(Materialized { status, changes })
            }
            Err(e) => {
                if !already_present {
                    warn!("Write failed, attempting rollback");
                    self.rollback(&root.join(dest_dir.as_path()));
                }
                Err(e)
            }
        }
    }

    fn stage_module(
        &self,
        module: &ModuleDescriptor,
        dest_dir: &RelativePath,
        staged: &mut Vec<Staged>,
    ) -> BlocksResult<()> {
        let src_root = self.registry.root().join(module.source_path.as_path());
        for file in &module.file_manifest {
            let content = self.read_source(&module.id, &src_root.join(file.as_path()))?;
            staged.push(Staged {
                dest: dest_dir.join(file.as_path())?,
                content,
                keep_existing: false,
            });
        }
        Ok(())
    }

    fn stage_commons(
        &self,
        module: &ModuleDescriptor,
        root: &Path,
        staged: &mut Vec<Staged>,
    ) -> BlocksResult<()> {
        let common_dir = RelativePath::try_new(&self.layout.common_dir)?;
        for id in &module.common_dependencies {
            let bundle = self
                .registry
                .common(id)
                .ok_or_else(|| DomainError::CommonBundleNotFound { id: id.clone() })?;
            let src_root = self.registry.root().join(bundle.source_path.as_path());
            for file in &bundle.files {
                let dest = common_dir.join(file.as_path())?;
                // shared across modules: only fill gaps
                if self.fs.exists(&root.join(dest.as_path())) {
                    continue;
                }
                let content = self.read_source(&bundle.id, &src_root.join(file.as_path()))?;
                staged.push(Staged {
                    dest,
                    content,
                    keep_existing: true,
                });
            }
        }
        Ok(())
    }

    /// `__init__.py` for every package directory on the way to the module
    /// and the common package.
    fn stage_markers(&self, module: &ModuleDescriptor, staged: &mut Vec<Staged>) -> BlocksResult<()> {
        let mut dirs = vec![RelativePath::try_new(&self.layout.modules_dir)?];
        if !module.common_dependencies.is_empty() {
            dirs.push(RelativePath::try_new(&self.layout.common_dir)?);
        }
        let mut markers: Vec<RelativePath> = Vec::new();
        for dir in dirs {
            let mut chain = dir.ancestors_top_down();
            chain.push(dir);
            for d in chain {
                let marker = d.join("__init__.py")?;
                if !markers.contains(&marker) && !staged.iter().any(|s| s.dest == marker) {
                    markers.push(marker);
                }
            }
        }
        staged.extend(markers.into_iter().map(|dest| Staged {
            dest,
            content: Vec::new(),
            keep_existing: true,
        }));
        Ok(())
    }

    fn read_source(&self, owner: &str, path: &Path) -> BlocksResult<Vec<u8>> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::ModuleSourceMissing {
                module: owner.to_string(),
                path: path.to_path_buf(),
            }
            .into());
        }
        self.fs.read(path)
    }

    fn outcomes(&self, root: &Path, staged: &[Staged]) -> BlocksResult<Vec<FileChange>> {
        staged
            .iter()
            .map(|s| {
                let path = root.join(s.dest.as_path());
                let outcome = if !self.fs.exists(&path) {
                    ChangeOutcome::Created
                } else if s.keep_existing {
                    ChangeOutcome::Skipped
                } else if self.fs.read(&path)? == s.content {
                    ChangeOutcome::Unchanged
                } else {
                    ChangeOutcome::Updated
                };
                Ok(FileChange::new(s.dest.to_slash(), outcome))
            })
            .collect()
    }

    fn write_all(&self, root: &Path, staged: &[Staged], changes: &[FileChange]) -> BlocksResult<()> {
        for (s, change) in staged.iter().zip(changes) {
            if matches!(change.outcome, ChangeOutcome::Skipped) {
                continue;
            }
            let path: PathBuf = root.join(s.dest.as_path());
            if let Some(parent) = path.parent() {
                self.fs.create_dir_all(parent)?;
            }
            self.fs.write_file(&path, &s.content)?;
        }
        Ok(())
    }

    /// Best-effort rollback on failure.
    fn rollback(&self, dir: &Path) {
        if !self.fs.exists(dir) {
            return;
        }
        if let Err(e) = self.fs.remove_dir_all(dir) {
            warn!(
                error = %e,
                path = %dir.display(),
                "Rollback failed"
            );
        } else {
            info!("Rollback successful");
        }
    }
}
