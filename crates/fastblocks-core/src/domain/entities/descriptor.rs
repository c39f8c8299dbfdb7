//! Catalog entities: module descriptors and the shared bundles they reference.
//!
//! Everything here is immutable once loaded. Adapters build these from the
//! on-disk catalog; the domain only reads them.

use serde::Serialize;

use super::common::RelativePath;

/// A runtime package requirement, `name` plus a version constraint.
///
/// The constraint is kept verbatim (`>=1.0`, `==2.3.1`, or empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimePackage {
    pub name: String,
    pub constraint: String,
}

impl RuntimePackage {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
        }
    }

    /// Split a requirement line such as `pyjwt[crypto]>=2.8` into name and constraint.
    ///
    /// Extras stay attached to the name so they survive into the manifest.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        let split = spec
            .find(|c: char| matches!(c, '<' | '>' | '=' | '!' | '~' | ';' | ' ' | '@'))
            .unwrap_or(spec.len());
        Self::new(spec[..split].trim(), spec[split..].trim())
    }

    /// The requirement line as it is written into a manifest.
    pub fn requirement_line(&self) -> String {
        format!("{}{}", self.name, self.constraint)
    }
}

/// Ordered environment variables added by a module, under one section label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EnvSection {
    pub section: String,
    pub variables: Vec<(String, String)>,
}

impl EnvSection {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// How a module's router is wired into the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRegistration {
    pub prefix: String,
    pub tags: Vec<String>,
    /// Wrap import and registration in a `try:` / `except ImportError:` guard.
    pub optional: bool,
}

/// Immutable description of an installable module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    /// Module file tree, relative to the registry root.
    pub source_path: RelativePath,
    /// Files to materialize, relative to `source_path`, in copy order.
    pub file_manifest: Vec<RelativePath>,
    pub runtime_packages: Vec<RuntimePackage>,
    pub module_dependencies: Vec<String>,
    pub common_dependencies: Vec<String>,
    pub config_dependencies: Vec<String>,
    pub environment: EnvSection,
    pub route: RouteRegistration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
}

impl ModuleDescriptor {
    /// Python import path of the module's router within a project.
    pub fn router_import_path(&self, modules_package: &str) -> String {
        format!("{}.{}.router", modules_package, self.python_name())
    }

    /// Local alias the router is imported under.
    pub fn router_alias(&self) -> String {
        format!("{}_router", self.python_name())
    }

    /// The id as a valid Python identifier (`-` becomes `_`).
    pub fn python_name(&self) -> String {
        self.id.replace('-', "_")
    }

    /// Case-insensitive match on id, name or description.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.id.to_lowercase().contains(&q)
            || self.name.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
    }
}

/// Shared utility files copied into the project's common package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonBundle {
    pub id: String,
    pub description: String,
    pub source_path: RelativePath,
    pub files: Vec<RelativePath>,
}

/// A settings class a module needs composed into the project `Settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsBlock {
    pub id: String,
    pub class_name: String,
    /// Attribute name on `Settings`, e.g. `auth`.
    pub field: String,
    /// Top-level import lines the definition needs.
    pub imports: Vec<String>,
    /// Full Python source of the class definition.
    pub definition: String,
}

impl SettingsBlock {
    /// The line wired into the `Settings` body.
    pub fn field_line(&self) -> String {
        format!("{}: {} = {}()", self.field, self.class_name, self.class_name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal descriptor for unit tests.
    pub fn descriptor(id: &str, deps: &[&str]) -> ModuleDescriptor {
        ModuleDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            description: format!("{id} module"),
            version: "1.0.0".into(),
            source_path: RelativePath::try_new(format!("modules/{id}")).unwrap(),
            file_manifest: vec![
                RelativePath::try_new("__init__.py").unwrap(),
                RelativePath::try_new("router.py").unwrap(),
            ],
            runtime_packages: vec![],
            module_dependencies: deps.iter().map(|d| d.to_string()).collect(),
            common_dependencies: vec![],
            config_dependencies: vec![],
            environment: EnvSection::default(),
            route: RouteRegistration {
                prefix: format!("/{id}"),
                tags: vec![id.to_string()],
                optional: false,
            },
            author: None,
            repository: None,
            python_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_parse_splits_constraint() {
        let p = RuntimePackage::parse("pyjwt[crypto]>=2.8.0");
        assert_eq!(p.name, "pyjwt[crypto]");
        assert_eq!(p.constraint, ">=2.8.0");
        assert_eq!(p.requirement_line(), "pyjwt[crypto]>=2.8.0");

        let bare = RuntimePackage::parse("  email-validator ");
        assert_eq!(bare.name, "email-validator");
        assert!(bare.constraint.is_empty());
    }

    #[test]
    fn router_names_are_python_identifiers() {
        let d = fixtures::descriptor("two-factor", &[]);
        assert_eq!(d.python_name(), "two_factor");
        assert_eq!(d.router_alias(), "two_factor_router");
        assert_eq!(d.router_import_path("app.modules"), "app.modules.two_factor.router");
    }

    #[test]
    fn search_matches_description_case_insensitively() {
        let d = fixtures::descriptor("auth", &[]);
        assert!(d.matches("AUTH MOD"));
        assert!(!d.matches("billing"));
    }
}
