//! Skeleton read from a directory tree.
//!
//! Every file under the root becomes a skeleton file at the same relative
//! path. A trailing `.template` suffix is dropped, so `main.py.template`
//! lands as `main.py`.

use std::path::PathBuf;

use tracing::{debug, instrument};
use walkdir::WalkDir;

use fastblocks_core::{
    application::{
        ApplicationError,
        ports::{SkeletonFile, SkeletonStore},
    },
    error::BlocksResult,
};

const TEMPLATE_SUFFIX: &str = ".template";

#[derive(Debug, Clone)]
pub struct DirectorySkeleton {
    root: PathBuf,
}

impl DirectorySkeleton {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SkeletonStore for DirectorySkeleton {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn files(&self) -> BlocksResult<Vec<SkeletonFile>> {
        let fs_error = |path: PathBuf, reason: String| ApplicationError::FilesystemError { path, reason };
        if !self.root.is_dir() {
            return Err(fs_error(self.root.clone(), "skeleton directory not found".into()).into());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| fs_error(self.root.clone(), e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let rel = rel
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("/");
            let path = rel.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(rel.as_str()).to_string();
            let content = std::fs::read_to_string(entry.path())
                .map_err(|e| fs_error(entry.path().to_path_buf(), e.to_string()))?;
            files.push(SkeletonFile { path, content });
        }
        debug!(files = files.len(), "skeleton loaded");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn template_suffix_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app/core")).unwrap();
        std::fs::write(dir.path().join("main.py.template"), "# {project_name}\n").unwrap();
        std::fs::write(dir.path().join("app/core/config.py"), "").unwrap();

        let files = DirectorySkeleton::new(dir.path()).files().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["app/core/config.py", "main.py"]);
        assert_eq!(files[1].content, "# {project_name}\n");
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(DirectorySkeleton::new("/definitely/not/here").files().is_err());
    }
}
