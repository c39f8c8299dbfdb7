//! Environment file (`.env`) merge.
//!
//! Missing keys are appended under a section header naming the module.
//! Existing values are never overwritten, whatever they are.

use std::collections::HashSet;

use super::{push_section_separator, MutationResult, MutatorKind, SourceMutator};
use crate::domain::entities::ModuleDescriptor;
use crate::domain::DomainError;

pub struct EnvironmentFile {
    file: String,
}

impl EnvironmentFile {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    /// Keys defined in `content`, tolerating `export` prefixes and comments.
    pub fn keys(&self, content: &str) -> Result<HashSet<String>, DomainError> {
        let mut keys = HashSet::new();
        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, _)) = line.split_once('=') else {
                return Err(DomainError::parse(
                    &self.file,
                    format!("line {} is not KEY=value: '{}'", i + 1, raw.trim()),
                ));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(DomainError::parse(
                    &self.file,
                    format!("line {} has an empty key", i + 1),
                ));
            }
            keys.insert(key.to_string());
        }
        Ok(keys)
    }

    pub fn header(module: &ModuleDescriptor) -> String {
        let section = if module.environment.section.is_empty() {
            module.name.as_str()
        } else {
            module.environment.section.as_str()
        };
        format!("# {} (module '{}')", section, module.id)
    }
}

/// Quote values that a dotenv reader would otherwise split or truncate.
fn format_value(value: &str) -> String {
    let already_quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if already_quoted || !value.chars().any(|c| c.is_whitespace() || c == '#') {
        return value.to_string();
    }
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl SourceMutator for EnvironmentFile {
    fn kind(&self) -> MutatorKind {
        MutatorKind::Env
    }

    fn applies_to(&self, module: &ModuleDescriptor) -> bool {
        !module.environment.is_empty()
    }

    fn apply(&self, current: &str, module: &ModuleDescriptor) -> Result<MutationResult, DomainError> {
        let mut present = self.keys(current)?;
        let missing: Vec<String> = module
            .environment
            .variables
            .iter()
            .filter(|(k, _)| present.insert(k.clone()))
            .map(|(k, v)| format!("{}={}", k, format_value(v)))
            .collect();

        if missing.is_empty() {
            return Ok(MutationResult::unchanged(current));
        }

        let header = Self::header(module);
        let lines: Vec<&str> = current.lines().collect();

        // a previous install left the header: top up that section in place
        if let Some(h) = lines.iter().position(|l| l.trim() == header) {
            let end = lines[h + 1..]
                .iter()
                .position(|l| l.trim().is_empty())
                .map(|off| h + 1 + off)
                .unwrap_or(lines.len());
            let mut out: Vec<String> = lines[..end].iter().map(|l| l.to_string()).collect();
            out.extend(missing);
            out.extend(lines[end..].iter().map(|l| l.to_string()));
            return Ok(MutationResult::rewritten(current, out.join("\n") + "\n"));
        }

        let mut out = current.to_string();
        push_section_separator(&mut out);
        out.push_str(&header);
        out.push('\n');
        for line in missing {
            out.push_str(&line);
            out.push('\n');
        }
        Ok(MutationResult::rewritten(current, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::descriptor::fixtures::descriptor;
    use crate::domain::entities::EnvSection;
    use pretty_assertions::assert_eq;

    fn auth() -> ModuleDescriptor {
        let mut d = descriptor("auth", &[]);
        d.environment = EnvSection {
            section: "Authentication".into(),
            variables: vec![
                ("JWT_SECRET".into(), "change-me".into()),
                ("JWT_ALGORITHM".into(), "HS256".into()),
                ("RESET_SUBJECT".into(), "Reset your password".into()),
            ],
        };
        d
    }

    fn env() -> EnvironmentFile {
        EnvironmentFile::new(".env")
    }

    #[test]
    fn appends_missing_keys_under_header() {
        let current = "APP_NAME=demo\nexport JWT_SECRET=already-set\n";
        let out = env().apply(current, &auth()).unwrap();
        assert_eq!(
            out.new_content,
            "APP_NAME=demo\nexport JWT_SECRET=already-set\n\n# Authentication (module 'auth')\nJWT_ALGORITHM=HS256\nRESET_SUBJECT=\"Reset your password\"\n"
        );
    }

    #[test]
    fn reapply_is_a_no_op() {
        let once = env().apply("", &auth()).unwrap();
        assert!(once.new_content.starts_with("# Authentication (module 'auth')\n"));
        let twice = env().apply(&once.new_content, &auth()).unwrap();
        assert!(!twice.changed);
    }

    #[test]
    fn deleted_key_returns_to_its_section() {
        let current = "# Authentication (module 'auth')\nJWT_SECRET=x\n\nOTHER=1\n";
        let out = env().apply(current, &auth()).unwrap();
        assert_eq!(
            out.new_content,
            "# Authentication (module 'auth')\nJWT_SECRET=x\nJWT_ALGORITHM=HS256\nRESET_SUBJECT=\"Reset your password\"\n\nOTHER=1\n"
        );
    }

    #[test]
    fn garbage_line_is_a_parse_error() {
        let err = env().apply("APP=1\nthis is not env\n", &auth()).unwrap_err();
        assert!(matches!(err, DomainError::Parse { ref reason, .. } if reason.contains("line 2")));
    }
}
