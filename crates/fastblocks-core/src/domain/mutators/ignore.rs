//! Ignore-pattern file (`.gitignore`) repair.
//!
//! If the module directory or any of its ancestors would be ignored by the
//! project's rules, a negation override is appended so the installed module
//! stays tracked.

use glob::{MatchOptions, Pattern};

use super::{push_section_separator, MutationResult, MutatorKind, SourceMutator};
use crate::domain::entities::{ModuleDescriptor, ProjectLayout};
use crate::domain::DomainError;

const MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One parsed gitignore rule.
#[derive(Debug)]
struct Rule {
    pattern: Option<Pattern>,
    negated: bool,
    dir_only: bool,
    anchored: bool,
}

impl Rule {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (negated, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line.strip_prefix('\\').unwrap_or(line)),
        };
        let (dir_only, body) = match body.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        if body.is_empty() {
            return None;
        }
        let anchored = body.contains('/');
        let body = body.trim_start_matches('/');
        Some(Self {
            // an invalid glob never matches, as with git
            pattern: Pattern::new(body).ok(),
            negated,
            dir_only,
            anchored,
        })
    }

    /// Match a directory path (forward slashes, relative to the project root).
    fn matches_dir(&self, path: &str) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        if self.anchored {
            pattern.matches_with(path, MATCH)
        } else {
            let name = path.rsplit('/').next().unwrap_or(path);
            pattern.matches_with(name, MATCH)
        }
    }
}

/// Gitignore evaluation: the last matching rule wins, and a directory
/// inside an ignored directory is ignored too.
struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    fn parse(content: &str) -> Self {
        Self {
            rules: content.lines().filter_map(Rule::parse).collect(),
        }
    }

    fn push(&mut self, line: &str) {
        if let Some(rule) = Rule::parse(line) {
            self.rules.push(rule);
        }
    }

    fn directly_ignored(&self, dir: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|r| r.matches_dir(dir))
            .is_some_and(|r| !r.negated)
    }
}

pub struct IgnorePattern {
    layout: ProjectLayout,
}

impl IgnorePattern {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    /// Whether `dir` would be ignored, considering its ancestors.
    pub fn is_ignored(content: &str, dir: &str) -> bool {
        let rules = RuleSet::parse(content);
        let mut prefix = String::new();
        dir.split('/').filter(|s| !s.is_empty()).any(|seg| {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(seg);
            rules.directly_ignored(&prefix)
        })
    }

    pub fn marker(module: &ModuleDescriptor) -> String {
        format!("# fastblocks: keep module '{}' tracked", module.id)
    }
}

impl SourceMutator for IgnorePattern {
    fn kind(&self) -> MutatorKind {
        MutatorKind::Ignore
    }

    fn apply(&self, current: &str, module: &ModuleDescriptor) -> Result<MutationResult, DomainError> {
        let target = self.layout.module_dir(&module.id)?;
        let mut rules = RuleSet::parse(current);
        let existing: Vec<&str> = current.lines().map(str::trim_end).collect();

        let mut overrides = Vec::new();
        let mut chain = target.ancestors_top_down();
        chain.push(target);
        for dir in chain {
            let path = dir.to_slash();
            if !rules.directly_ignored(&path) {
                continue;
            }
            let line = format!("!/{}/", path);
            if existing.contains(&line.as_str()) || overrides.contains(&line) {
                continue;
            }
            rules.push(&line);
            overrides.push(line);
        }

        if overrides.is_empty() {
            return Ok(MutationResult::unchanged(current));
        }

        let mut out = current.to_string();
        push_section_separator(&mut out);
        let marker = Self::marker(module);
        if !existing.contains(&marker.as_str()) {
            out.push_str(&marker);
            out.push('\n');
        }
        for line in overrides {
            out.push_str(&line);
            out.push('\n');
        }
        Ok(MutationResult::rewritten(current, out))
    }
}
