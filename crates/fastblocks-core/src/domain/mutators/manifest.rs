//! Package manifest (`requirements.txt`) merge.
//!
//! Presence-based: a package already listed under any constraint is left
//! alone. Missing packages are appended at the end of the file.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{MutationResult, MutatorKind, SourceMutator};
use crate::domain::entities::ModuleDescriptor;
use crate::domain::DomainError;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid separator regex"));

/// Normalized distribution name: case-folded, runs of `-_.` become `-`.
///
/// Extras (`[crypto]`), constraints, markers and inline comments are ignored.
pub fn normalize_name(requirement: &str) -> String {
    let end = requirement
        .find(|c: char| matches!(c, '[' | '<' | '>' | '=' | '!' | '~' | ';' | '@' | '#') || c.is_whitespace())
        .unwrap_or(requirement.len());
    SEPARATORS
        .replace_all(&requirement[..end].to_lowercase(), "-")
        .into_owned()
}

/// Names already listed in a manifest.
pub fn listed_names(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('-'))
        .map(normalize_name)
        .filter(|n| !n.is_empty())
        .collect()
}

pub struct PackageManifest;

impl SourceMutator for PackageManifest {
    fn kind(&self) -> MutatorKind {
        MutatorKind::Manifest
    }

    fn applies_to(&self, module: &ModuleDescriptor) -> bool {
        !module.runtime_packages.is_empty()
    }

    fn apply(&self, current: &str, module: &ModuleDescriptor) -> Result<MutationResult, DomainError> {
        let mut present = listed_names(current);
        let missing: Vec<String> = module
            .runtime_packages
            .iter()
            .filter(|p| present.insert(normalize_name(&p.name)))
            .map(|p| p.requirement_line())
            .collect();

        if missing.is_empty() {
            return Ok(MutationResult::unchanged(current));
        }

        let mut out = current.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        for line in missing {
            out.push_str(&line);
            out.push('\n');
        }
        Ok(MutationResult::rewritten(current, out))
    }
}
