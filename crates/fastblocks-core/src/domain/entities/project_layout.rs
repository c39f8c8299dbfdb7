use serde::{Deserialize, Serialize};

use super::common::RelativePath;
use crate::domain::DomainError;

/// Where things live inside a target FastAPI project.
///
/// All paths are relative to the project root. Overridable from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    pub modules_dir: String,
    pub common_dir: String,
    pub route_file: String,
    /// Tried when `route_file` does not exist.
    pub route_fallback: String,
    pub manifest_file: String,
    pub env_file: String,
    pub settings_file: String,
    pub ignore_file: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            modules_dir: "app/modules".into(),
            common_dir: "app/common".into(),
            route_file: "app/api/router.py".into(),
            route_fallback: "main.py".into(),
            manifest_file: "requirements.txt".into(),
            env_file: ".env".into(),
            settings_file: "app/core/config.py".into(),
            ignore_file: ".gitignore".into(),
        }
    }
}

impl ProjectLayout {
    /// Check that every entry is a safe relative path.
    pub fn validate(&self) -> Result<(), DomainError> {
        for p in [
            &self.modules_dir,
            &self.common_dir,
            &self.route_file,
            &self.route_fallback,
            &self.manifest_file,
            &self.env_file,
            &self.settings_file,
            &self.ignore_file,
        ] {
            RelativePath::try_new(p)?;
        }
        Ok(())
    }

    /// Destination directory of a module.
    pub fn module_dir(&self, id: &str) -> Result<RelativePath, DomainError> {
        RelativePath::try_new(&self.modules_dir)?.join(id.replace('-', "_"))
    }

    /// Dotted Python package of the modules directory (`app.modules`).
    pub fn modules_package(&self) -> String {
        dotted(&self.modules_dir)
    }

    /// Dotted Python package of the common directory (`app.common`).
    pub fn common_package(&self) -> String {
        dotted(&self.common_dir)
    }
}

fn dotted(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_skeleton() {
        let layout = ProjectLayout::default();
        assert_eq!(layout.modules_package(), "app.modules");
        assert_eq!(layout.module_dir("two-factor").unwrap().to_string(), "app/modules/two_factor");
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn escaping_override_is_invalid() {
        let layout = ProjectLayout {
            modules_dir: "../elsewhere".into(),
            ..ProjectLayout::default()
        };
        assert!(layout.validate().is_err());
    }
}
