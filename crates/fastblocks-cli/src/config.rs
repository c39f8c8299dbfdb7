//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The
//! CLI layer owns config; the core crate only sees the [`ProjectLayout`]
//! taken from it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (applied at the call-site, not here)
//! 2. `FASTBLOCKS_*` environment variables, `__` between sections
//!    (`FASTBLOCKS_INSTALL__ASSUME_YES=true`)
//! 3. Config file (`--config`, or [`AppConfig::config_path`])
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use fastblocks_core::domain::ProjectLayout;

pub const ENV_PREFIX: &str = "FASTBLOCKS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub install: InstallConfig,
    /// Where aggregator files live inside target projects.
    pub layout: ProjectLayout,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Install missing prerequisites before the requested module.
    pub resolve_dependencies: bool,
    /// Never ask for confirmation.
    pub assume_yes: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            resolve_dependencies: true,
            assume_yes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    /// `auto`, `human`, `plain` or `json`.
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "auto".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
}

impl AppConfig {
    /// Merge defaults, the config file and the environment.
    ///
    /// An explicit `config_file` must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let (path, required) = match config_file {
            Some(p) => (p.clone(), true),
            None => (Self::config_path(), false),
        };
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        Self::from_sources(&path, required, Some(env))
    }

    fn from_sources(path: &Path, required: bool, env: Option<Environment>) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default()).context("invalid built-in defaults")?)
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(required));
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let config: Self = builder
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("configuration has an unexpected shape")?;
        config
            .layout
            .validate()
            .context("invalid [layout] configuration")?;
        Ok(config)
    }

    /// Path to the default configuration file.
    ///
    /// `directories::ProjectDirs` picks the platform location, falling back
    /// to `.fastblocks.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "fastblocks", "fastblocks")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".fastblocks.toml"))
    }

    /// Value at a dotted key such as `install.assume_yes`; `None` for an
    /// unknown key, an empty string for an unset optional value.
    pub fn get(&self, key: &str) -> Option<String> {
        let tree = serde_json::to_value(self).ok()?;
        let pointer = format!("/{}", key.replace('.', "/"));
        match tree.pointer(&pointer)? {
            serde_json::Value::Null => Some(String::new()),
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }
}
