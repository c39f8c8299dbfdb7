//! Project Initializer - writes a fresh FastAPI skeleton.
//!
//! Used once per project. The skeleton's aggregator files are the shapes the
//! mutators expect, so `add` works right after `init`.

use std::path::Path;
use tracing::{info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{Filesystem, SkeletonStore},
    },
    domain::{DomainValidator as validator, RelativePath},
    error::BlocksResult,
};

/// Values substituted into the skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub name: String,
    pub description: String,
    pub secret_key: String,
}

impl InitRequest {
    fn render(&self, template: &str) -> String {
        template
            .replace("{project_name}", &self.name)
            .replace("{project_description}", &self.description)
            .replace("{secret_key}", &self.secret_key)
    }
}

pub struct ProjectInitializer {
    filesystem: Box<dyn Filesystem>,
    skeleton: Box<dyn SkeletonStore>,
}

impl ProjectInitializer {
    pub fn new(filesystem: Box<dyn Filesystem>, skeleton: Box<dyn SkeletonStore>) -> Self {
        Self {
            filesystem,
            skeleton,
        }
    }

    /// Write the skeleton into `root`, returning the project-relative paths
    /// written.
    ///
    /// A non-empty `root` is refused unless `force` is set; with `force`,
    /// skeleton files overwrite what is there and nothing else is touched.
    #[instrument(skip_all, fields(root = %root.display(), project = %request.name, force))]
    pub fn init(&self, root: &Path, request: &InitRequest, force: bool) -> BlocksResult<Vec<String>> {
        validator::validate_project_name(&request.name)?;

        let fresh = !self.filesystem.exists(root);
        if !fresh && !force && !self.filesystem.list_dir(root)?.is_empty() {
            return Err(ApplicationError::ProjectNotEmpty {
                path: root.to_path_buf(),
            }
            .into());
        }

        // resolve every path before the first write
        let files = self
            .skeleton
            .files()?
            .into_iter()
            .map(|f| Ok((RelativePath::try_new(&f.path)?, request.render(&f.content))))
            .collect::<BlocksResult<Vec<_>>>()?;

        match self.write_all(root, &files) {
            Ok(()) => {
                info!(files = files.len(), "Project skeleton written");
                Ok(files.iter().map(|(p, _)| p.to_slash()).collect())
            }
            Err(e) => {
                if fresh {
                    warn!("Write failed, attempting rollback");
                    self.rollback(root);
                }
                Err(e)
            }
        }
    }

    fn write_all(&self, root: &Path, files: &[(RelativePath, String)]) -> BlocksResult<()> {
        self.filesystem.create_dir_all(root)?;
        for (rel, content) in files {
            let path = root.join(rel.as_path());
            if let Some(parent) = path.parent() {
                self.filesystem.create_dir_all(parent)?;
            }
            self.filesystem.write_file(&path, content.as_bytes())?;
        }
        Ok(())
    }

    fn rollback(&self, root: &Path) {
        if let Err(e) = self.filesystem.remove_dir_all(root) {
            warn!(error = %e, path = %root.display(), "Rollback failed");
        } else {
            info!("Rollback successful");
        }
    }
}
