//! Pure, idempotent text mutators for the five shared aggregator files.
//!
//! A mutator takes the current file content and a module descriptor and
//! returns the content the file should have. Applying a mutator to its own
//! output is always a no-op (`changed == false`). Writing is someone else's
//! job, which is what makes `--dry-run` possible.

pub mod env;
pub mod ignore;
pub mod manifest;
pub mod route;
pub mod scanner;
pub mod settings;

use std::fmt;

use crate::domain::entities::ModuleDescriptor;
use crate::domain::DomainError;

pub use env::EnvironmentFile;
pub use ignore::IgnorePattern;
pub use manifest::PackageManifest;
pub use route::RouteAggregator;
pub use settings::SettingsInjection;

/// Output of a mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub changed: bool,
    pub new_content: String,
}

impl MutationResult {
    pub fn unchanged(content: &str) -> Self {
        Self {
            changed: false,
            new_content: content.to_string(),
        }
    }

    pub fn changed(new_content: String) -> Self {
        Self {
            changed: true,
            new_content,
        }
    }

    /// `new_content` as a replacement for `original`, in the line endings
    /// `original` uses. Mutators build their output with `\n` only.
    pub fn rewritten(original: &str, new_content: String) -> Self {
        if uses_crlf(original) {
            Self::changed(new_content.replace("\r\n", "\n").replace('\n', "\r\n"))
        } else {
            Self::changed(new_content)
        }
    }
}

/// Decided by the first line ending in the file.
fn uses_crlf(content: &str) -> bool {
    content
        .find('\n')
        .is_some_and(|i| content[..i].ends_with('\r'))
}

/// Which aggregator a mutator owns. Also the fixed application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MutatorKind {
    Route,
    Manifest,
    Env,
    Settings,
    Ignore,
}

impl MutatorKind {
    pub const ORDER: [MutatorKind; 5] = [
        Self::Route,
        Self::Manifest,
        Self::Env,
        Self::Settings,
        Self::Ignore,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Manifest => "manifest",
            Self::Env => "env",
            Self::Settings => "settings",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for MutatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pure transformation of one aggregator file.
pub trait SourceMutator {
    fn kind(&self) -> MutatorKind;

    /// Whether this module needs anything from this aggregator at all.
    fn applies_to(&self, _module: &ModuleDescriptor) -> bool {
        true
    }

    /// Compute the new content. Errors are `DomainError::Parse` and leave
    /// the file untouched.
    fn apply(&self, current: &str, module: &ModuleDescriptor) -> Result<MutationResult, DomainError>;
}

/// Ensure a non-empty buffer ends with exactly one blank line before an
/// appended section.
pub(crate) fn push_section_separator(out: &mut String) {
    if out.is_empty() {
        return;
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    if !out.ends_with("\n\n") {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewritten_keeps_crlf_files_crlf() {
        let out = MutationResult::rewritten("A=1\r\n", "A=1\r\nB=2\n".to_string());
        assert_eq!(out.new_content, "A=1\r\nB=2\r\n");
        assert!(out.changed);

        let out = MutationResult::rewritten("A=1\n", "A=1\nB=2\n".to_string());
        assert_eq!(out.new_content, "A=1\nB=2\n");
    }

    #[test]
    fn order_is_route_first_ignore_last() {
        let names: Vec<&str> = MutatorKind::ORDER.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["route", "manifest", "env", "settings", "ignore"]);
    }

    #[test]
    fn separator_adds_single_blank_line() {
        let mut s = String::from("A=1");
        push_section_separator(&mut s);
        assert_eq!(s, "A=1\n\n");
        push_section_separator(&mut s);
        assert_eq!(s, "A=1\n\n");

        let mut empty = String::new();
        push_section_separator(&mut empty);
        assert!(empty.is_empty());
    }
}
