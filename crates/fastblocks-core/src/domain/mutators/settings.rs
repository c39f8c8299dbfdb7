//! Settings injection: composes settings blocks into the project `Settings`.
//!
//! For each config dependency of a module:
//! - the block's imports are added at top level when missing,
//! - the block's class is inserted before `class Settings` unless a
//!   top-level class of that name already exists,
//! - `<field>: <Class> = <Class>()` is wired into the `Settings` body.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::scanner::{PyLine, PySource};
use super::scanner::{collapse_whitespace, LineEdits};
use super::{MutationResult, MutatorKind, SourceMutator};
use crate::domain::entities::{ModuleDescriptor, Registry, SettingsBlock};
use crate::domain::DomainError;

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*:").expect("valid field regex"));

const SETTINGS_CLASS: &str = "Settings";

pub struct SettingsInjection<'r> {
    registry: &'r Registry,
    file: String,
}

impl<'r> SettingsInjection<'r> {
    pub fn new(registry: &'r Registry, file: impl Into<String>) -> Self {
        Self {
            registry,
            file: file.into(),
        }
    }

    fn has_import(py: &PySource, required: &str) -> bool {
        let wanted = PySource::scan(required)
            .ok()
            .and_then(|p| p.statements.into_iter().find(|s| s.is_code()));
        match wanted.map(|s| s.kind) {
            Some(PyLine::Import { from, names }) => py.top_level_imports().any(|s| match &s.kind {
                PyLine::Import {
                    from: have_from,
                    names: have,
                } => *have_from == from && names.iter().all(|n| have.contains(n)),
                _ => false,
            }),
            _ => {
                let norm = collapse_whitespace(required);
                py.statements.iter().any(|s| s.code == norm)
            }
        }
    }

    fn inject(&self, content: &str, block: &SettingsBlock) -> Result<Option<String>, DomainError> {
        let py = PySource::scan(content).map_err(|r| DomainError::parse(&self.file, r))?;
        let settings = py.class_def(SETTINGS_CLASS).ok_or_else(|| {
            DomainError::parse(&self.file, format!("no top-level 'class {}' found", SETTINGS_CLASS))
        })?;
        let body = py.block_body(settings);
        let Some(&last_body) = body.last() else {
            return Err(DomainError::parse(
                &self.file,
                format!("'class {}' has no indented body", SETTINGS_CLASS),
            ));
        };
        let indent = py.statements[body[0]].indent;

        let mut edits = LineEdits::default();

        let mut imports: Vec<String> = Vec::new();
        for imp in &block.imports {
            let line = collapse_whitespace(imp);
            if !Self::has_import(&py, &line) && !imports.contains(&line) {
                imports.push(line);
            }
        }
        if !imports.is_empty() {
            let at = py.import_insertion_point();
            let had_imports = py.after_last_top_level_import().is_some();
            edits.insert(at, imports);
            if !had_imports {
                edits.insert(at, [String::new()]);
            }
        }

        if py.class_def(&block.class_name).is_none() {
            let definition = block.definition.trim_end();
            edits.insert(
                py.statements[settings].start,
                definition
                    .lines()
                    .map(str::to_string)
                    .chain([String::new(), String::new()]),
            );
        }

        let wired = body.iter().any(|&b| {
            let s = &py.statements[b];
            s.indent == indent
                && FIELD
                    .captures(&s.code)
                    .is_some_and(|c| &c[1] == block.field.as_str())
        });
        if !wired {
            edits.insert(
                py.statements[last_body].end + 1,
                [format!("{}{}", " ".repeat(indent), block.field_line())],
            );
        }

        if edits.is_empty() {
            return Ok(None);
        }
        Ok(Some(edits.apply(&py.lines)))
    }
}

impl SourceMutator for SettingsInjection<'_> {
    fn kind(&self) -> MutatorKind {
        MutatorKind::Settings
    }

    fn applies_to(&self, module: &ModuleDescriptor) -> bool {
        !module.config_dependencies.is_empty()
    }

    fn apply(&self, current: &str, module: &ModuleDescriptor) -> Result<MutationResult, DomainError> {
        let mut content = current.to_string();
        let mut changed = false;
        for id in &module.config_dependencies {
            let block = self
                .registry
                .settings_block(id)
                .ok_or_else(|| DomainError::SettingsBlockNotFound { id: id.clone() })?;
            if let Some(next) = self.inject(&content, block)? {
                debug!(module = %module.id, block = %block.id, "injected settings block");
                content = next;
                changed = true;
            }
        }
        if changed {
            Ok(MutationResult::rewritten(current, content))
        } else {
            Ok(MutationResult::unchanged(current))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::descriptor::fixtures::descriptor;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = "\
from pydantic_settings import BaseSettings, SettingsConfigDict


class Settings(BaseSettings):
    model_config = SettingsConfigDict(env_file=\".env\", extra=\"ignore\")

    app_name: str = \"demo\"
    secret_key: str = \"x\"


settings = Settings()
";

    fn registry() -> Registry {
        Registry::new(
            "/reg",
            vec![],
            vec![],
            vec![
                SettingsBlock {
                    id: "auth".into(),
                    class_name: "AuthSettings".into(),
                    field: "auth".into(),
                    imports: vec!["from pydantic_settings import  BaseSettings".into()],
                    definition: "class AuthSettings(BaseSettings):\n    jwt_secret: str = \"change-me\"\n    jwt_algorithm: str = \"HS256\"\n".into(),
                },
                SettingsBlock {
                    id: "mail".into(),
                    class_name: "MailSettings".into(),
                    field: "mail".into(),
                    imports: vec!["from pydantic import EmailStr".into()],
                    definition: "class MailSettings(BaseSettings):\n    sender: EmailStr = \"noreply@example.com\"".into(),
                },
            ],
        )
        .unwrap()
    }

    fn module(blocks: &[&str]) -> ModuleDescriptor {
        let mut d = descriptor("auth", &[]);
        d.config_dependencies = blocks.iter().map(|b| b.to_string()).collect();
        d
    }

    #[test]
    fn injects_class_and_field() {
        let reg = registry();
        let out = SettingsInjection::new(&reg, "app/core/config.py")
            .apply(CONFIG, &module(&["auth"]))
            .unwrap();
        assert_eq!(
            out.new_content,
            "\
from pydantic_settings import BaseSettings, SettingsConfigDict


class AuthSettings(BaseSettings):
    jwt_secret: str = \"change-me\"
    jwt_algorithm: str = \"HS256\"


class Settings(BaseSettings):
    model_config = SettingsConfigDict(env_file=\".env\", extra=\"ignore\")

    app_name: str = \"demo\"
    secret_key: str = \"x\"
    auth: AuthSettings = AuthSettings()


settings = Settings()
"
        );
    }

    #[test]
    fn multiple_blocks_and_idempotence() {
        let reg = registry();
        let m = SettingsInjection::new(&reg, "app/core/config.py");
        let once = m.apply(CONFIG, &module(&["auth", "mail"])).unwrap();
        assert!(once.new_content.contains("from pydantic import EmailStr\n"));
        assert!(once.new_content.contains("    mail: MailSettings = MailSettings()\n"));
        let twice = m.apply(&once.new_content, &module(&["auth", "mail"])).unwrap();
        assert!(!twice.changed);
    }

    #[test]
    fn user_defined_class_is_not_replaced() {
        let reg = registry();
        let custom = CONFIG.replace(
            "class Settings",
            "class AuthSettings(BaseSettings):\n    jwt_secret: str = \"mine\"\n\n\nclass Settings",
        );
        let out = SettingsInjection::new(&reg, "app/core/config.py")
            .apply(&custom, &module(&["auth"]))
            .unwrap();
        assert_eq!(out.new_content.matches("class AuthSettings").count(), 1);
        assert!(out.new_content.contains("jwt_secret: str = \"mine\""));
        assert!(out.new_content.contains("    auth: AuthSettings = AuthSettings()"));
    }

    #[test]
    fn missing_settings_class_is_a_parse_error() {
        let reg = registry();
        let err = SettingsInjection::new(&reg, "app/core/config.py")
            .apply("x = 1\n", &module(&["auth"]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Parse { .. }));
    }

    #[test]
    fn unknown_block_is_not_found() {
        let reg = registry();
        let err = SettingsInjection::new(&reg, "app/core/config.py")
            .apply(CONFIG, &module(&["billing"]))
            .unwrap_err();
        assert_eq!(err, DomainError::SettingsBlockNotFound { id: "billing".into() });
    }
}
