//! Finds the registry directory.
//!
//! Candidates, first match wins:
//! 1. an explicit path (`--registry`)
//! 2. `FASTBLOCKS_REGISTRY_DIR`
//! 3. `registry.path` from the config file
//! 4. `./registry`
//! 5. `registry/` next to the executable, then `../share/fastblocks/registry`

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use fastblocks_core::error::{BlocksError, BlocksResult};

use crate::catalog::CATALOG_FILES;

pub const REGISTRY_DIR_ENV: &str = "FASTBLOCKS_REGISTRY_DIR";

/// Which rule produced the registry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOrigin {
    Flag,
    Environment,
    Config,
    WorkingDirectory,
    Executable,
}

impl fmt::Display for RegistryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "--registry",
            Self::Environment => REGISTRY_DIR_ENV,
            Self::Config => "config file",
            Self::WorkingDirectory => "working directory",
            Self::Executable => "installation directory",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLocation {
    pub path: PathBuf,
    pub origin: RegistryOrigin,
}

#[derive(Debug, Clone, Default)]
pub struct RegistryLocator {
    flag: Option<PathBuf>,
    env: Option<PathBuf>,
    config: Option<PathBuf>,
    cwd: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
}

impl RegistryLocator {
    /// Locator seeded from the process environment.
    pub fn from_env() -> Self {
        Self {
            flag: None,
            env: std::env::var_os(REGISTRY_DIR_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            config: None,
            cwd: std::env::current_dir().ok(),
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf)),
        }
    }

    pub fn with_flag(mut self, path: Option<PathBuf>) -> Self {
        self.flag = path;
        self
    }

    pub fn with_env(mut self, path: Option<PathBuf>) -> Self {
        self.env = path;
        self
    }

    pub fn with_config(mut self, path: Option<PathBuf>) -> Self {
        self.config = path;
        self
    }

    pub fn with_cwd(mut self, path: Option<PathBuf>) -> Self {
        self.cwd = path;
        self
    }

    pub fn with_exe_dir(mut self, path: Option<PathBuf>) -> Self {
        self.exe_dir = path;
        self
    }

    /// Explicit sources are trusted as given; discovered ones must hold a catalog.
    pub fn locate(&self) -> BlocksResult<RegistryLocation> {
        let explicit = [
            (&self.flag, RegistryOrigin::Flag),
            (&self.env, RegistryOrigin::Environment),
            (&self.config, RegistryOrigin::Config),
        ];
        if let Some((path, origin)) = explicit
            .into_iter()
            .find_map(|(p, origin)| p.as_ref().map(|p| (p, origin)))
        {
            debug!(path = %path.display(), %origin, "registry location");
            return Ok(RegistryLocation {
                path: path.clone(),
                origin,
            });
        }

        let mut tried = Vec::new();
        let discovered = self
            .cwd
            .iter()
            .map(|d| (d.join("registry"), RegistryOrigin::WorkingDirectory))
            .chain(self.exe_dir.iter().flat_map(|d| {
                [
                    (d.join("registry"), RegistryOrigin::Executable),
                    (d.join("../share/fastblocks/registry"), RegistryOrigin::Executable),
                ]
            }));
        for (path, origin) in discovered {
            if has_catalog(&path) {
                debug!(path = %path.display(), %origin, "registry discovered");
                return Ok(RegistryLocation { path, origin });
            }
            tried.push(path.display().to_string());
        }

        Err(BlocksError::Configuration {
            message: format!(
                "no module registry found (tried {}); pass --registry or set {}",
                if tried.is_empty() {
                    "nothing".to_string()
                } else {
                    tried.join(", ")
                },
                REGISTRY_DIR_ENV
            ),
        })
    }
}

fn has_catalog(dir: &Path) -> bool {
    CATALOG_FILES.iter().any(|f| dir.join(f).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> RegistryLocator {
        RegistryLocator::default()
    }

    #[test]
    fn flag_beats_environment_and_config() {
        let loc = empty()
            .with_flag(Some("/a".into()))
            .with_env(Some("/b".into()))
            .with_config(Some("/c".into()))
            .locate()
            .unwrap();
        assert_eq!(loc.path, PathBuf::from("/a"));
        assert_eq!(loc.origin, RegistryOrigin::Flag);

        let loc = empty()
            .with_env(Some("/b".into()))
            .with_config(Some("/c".into()))
            .locate()
            .unwrap();
        assert_eq!(loc.origin, RegistryOrigin::Environment);
    }

    #[test]
    fn discovery_requires_a_catalog_file() {
        let cwd = tempfile::tempdir().unwrap();
        let exe = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(cwd.path().join("registry")).unwrap();
        std::fs::create_dir_all(exe.path().join("registry")).unwrap();
        std::fs::write(exe.path().join("registry/registry.toml"), "").unwrap();

        let loc = empty()
            .with_cwd(Some(cwd.path().to_path_buf()))
            .with_exe_dir(Some(exe.path().to_path_buf()))
            .locate()
            .unwrap();
        assert_eq!(loc.path, exe.path().join("registry"));
        assert_eq!(loc.origin, RegistryOrigin::Executable);
    }

    #[test]
    fn nothing_found_is_a_configuration_error() {
        let err = empty().locate().unwrap_err();
        assert!(matches!(err, BlocksError::Configuration { .. }));
        assert!(err.to_string().contains(REGISTRY_DIR_ENV));
    }
}
