//! Catalog sources: `registry.json` and `registry.toml`.
//!
//! Both formats share one schema (see [`schema`]). Source paths in the
//! catalog are relative to the directory holding the catalog file.

mod node;
mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use fastblocks_core::{
    application::ports::CatalogSource,
    domain::{DomainError, Registry},
    error::{BlocksError, BlocksResult},
};

use node::Node;

/// File names probed, in order, when a registry directory is given.
pub const CATALOG_FILES: &[&str] = &["registry.json", "registry.toml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Toml,
}

impl CatalogFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn parse(self, text: &str, origin: &str) -> Result<Node, DomainError> {
        let parsed: Result<Node, String> = match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| DomainError::InvalidCatalog {
            path: origin.to_string(),
            reason,
        })
    }
}

/// Where the catalog text comes from.
#[derive(Debug, Clone)]
enum Text {
    File(PathBuf),
    Inline(String),
}

#[derive(Debug, Clone)]
struct Catalog {
    format: CatalogFormat,
    root: PathBuf,
    text: Text,
}

impl Catalog {
    fn describe(&self) -> String {
        match &self.text {
            Text::File(path) => path.display().to_string(),
            Text::Inline(_) => format!("inline catalog at {}", self.root.display()),
        }
    }

    #[instrument(skip(self), fields(source = %self.describe()))]
    fn load(&self) -> BlocksResult<Registry> {
        let origin = self.describe();
        let doc = match &self.text {
            Text::File(path) => {
                let raw = fs::read_to_string(path).map_err(|e| DomainError::InvalidCatalog {
                    path: origin.clone(),
                    reason: format!("failed to read: {e}"),
                })?;
                self.format.parse(&raw, &origin)?
            }
            Text::Inline(raw) => self.format.parse(raw, &origin)?,
        };
        let registry = schema::build_registry(&self.root, &doc)?;
        debug!(modules = registry.len(), "catalog loaded");
        Ok(registry)
    }
}

/// `registry.json` catalog.
#[derive(Debug, Clone)]
pub struct JsonCatalog(Catalog);

impl JsonCatalog {
    /// Catalog file on disk; its directory becomes the registry root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self(Catalog {
            format: CatalogFormat::Json,
            root: parent_dir(&path),
            text: Text::File(path),
        })
    }

    /// Catalog text held in memory, with source paths resolved against `root`.
    pub fn from_str(root: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self(Catalog {
            format: CatalogFormat::Json,
            root: root.into(),
            text: Text::Inline(text.into()),
        })
    }
}

impl CatalogSource for JsonCatalog {
    fn load(&self) -> BlocksResult<Registry> {
        self.0.load()
    }

    fn describe(&self) -> String {
        self.0.describe()
    }
}

/// `registry.toml` catalog. Same schema as JSON.
#[derive(Debug, Clone)]
pub struct TomlCatalog(Catalog);

impl TomlCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self(Catalog {
            format: CatalogFormat::Toml,
            root: parent_dir(&path),
            text: Text::File(path),
        })
    }

    pub fn from_str(root: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self(Catalog {
            format: CatalogFormat::Toml,
            root: root.into(),
            text: Text::Inline(text.into()),
        })
    }
}

impl CatalogSource for TomlCatalog {
    fn load(&self) -> BlocksResult<Registry> {
        self.0.load()
    }

    fn describe(&self) -> String {
        self.0.describe()
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Open a catalog from a file, or from a registry directory holding one of
/// [`CATALOG_FILES`].
pub fn open_catalog(location: &Path) -> BlocksResult<Box<dyn CatalogSource>> {
    let file = if location.is_dir() {
        CATALOG_FILES
            .iter()
            .map(|name| location.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| BlocksError::Configuration {
                message: format!(
                    "no {} in {}",
                    CATALOG_FILES.join(" or "),
                    location.display()
                ),
            })?
    } else {
        location.to_path_buf()
    };

    match CatalogFormat::from_path(&file) {
        Some(CatalogFormat::Json) => Ok(Box::new(JsonCatalog::new(file))),
        Some(CatalogFormat::Toml) => Ok(Box::new(TomlCatalog::new(file))),
        None => Err(BlocksError::Configuration {
            message: format!(
                "unsupported catalog format: {} (expected .json or .toml)",
                file.display()
            ),
        }),
    }
}
