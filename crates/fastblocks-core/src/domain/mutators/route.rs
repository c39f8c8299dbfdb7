//! Route aggregator: wires a module's router into the application router.
//!
//! Registration shape:
//!
//! ```python
//! from app.modules.users.router import router as users_router
//!
//! api_router.include_router(users_router, prefix="/users", tags=["Users"])
//! ```
//!
//! Optional modules get the pair wrapped in a `try:` / `except ImportError:`
//! guard so the application still starts when the module is removed.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::scanner::{Guard, LineEdits, PyLine, PySource};
use super::{MutationResult, MutatorKind, SourceMutator};
use crate::domain::entities::ModuleDescriptor;
use crate::domain::DomainError;

static AGGREGATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*(?::\s*[\w.\[\]]+\s*)?=\s*(?:\w+\.)*(?:APIRouter|FastAPI)\s*\(")
        .expect("valid aggregate regex")
});

const DEFAULT_INDENT: &str = "    ";

/// Where the module's router import currently lives.
struct ExistingImport {
    stmt: usize,
    bound: String,
}

pub struct RouteAggregator {
    modules_package: String,
    file: String,
}

impl RouteAggregator {
    /// `modules_package` is the dotted package modules live in (`app.modules`);
    /// `file` labels parse errors.
    pub fn new(modules_package: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            modules_package: modules_package.into(),
            file: file.into(),
        }
    }

    fn parse(&self, content: &str) -> Result<(PySource, Vec<Guard>), DomainError> {
        let py = PySource::scan(content).map_err(|r| DomainError::parse(&self.file, r))?;
        let guards = py.guards().map_err(|r| DomainError::parse(&self.file, r))?;
        Ok((py, guards))
    }

    fn find_imports(&self, py: &PySource, module: &ModuleDescriptor) -> Vec<ExistingImport> {
        let path = module.router_import_path(&self.modules_package);
        py.statements
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.kind {
                PyLine::Import {
                    from: Some(from),
                    names,
                } if *from == path => names
                    .iter()
                    .find(|n| n.name == "router")
                    .map(|n| ExistingImport {
                        stmt: i,
                        bound: n.bound().to_string(),
                    }),
                _ => None,
            })
            .collect()
    }

    fn is_registration_of(kind: &PyLine, bound: &str, prefix: &str) -> bool {
        matches!(kind, PyLine::Registration { target, prefix: p, .. }
            if target == bound && p.as_deref().unwrap_or("") == prefix)
    }

    /// Whether both the import and the registration are present.
    pub fn is_registered(
        &self,
        content: &str,
        module: &ModuleDescriptor,
    ) -> Result<bool, DomainError> {
        let (py, _) = self.parse(content)?;
        let imports = self.find_imports(&py, module);
        Ok(imports.iter().any(|imp| {
            py.statements
                .iter()
                .any(|s| Self::is_registration_of(&s.kind, &imp.bound, &module.route.prefix))
        }))
    }

    /// Remove the module's import, registration and guard.
    pub fn unregister(
        &self,
        current: &str,
        module: &ModuleDescriptor,
    ) -> Result<MutationResult, DomainError> {
        let (py, guards) = self.parse(current)?;
        let imports = self.find_imports(&py, module);
        let mut bound: Vec<String> = imports.iter().map(|i| i.bound.clone()).collect();
        bound.push(module.router_alias());

        let mut ranges: Vec<(usize, usize)> = Vec::new();
        let covered = |start: usize, end: usize, ranges: &mut Vec<(usize, usize)>| {
            if !ranges.iter().any(|&(s, e)| start >= s && end <= e) {
                ranges.push((start, end));
            }
        };

        for g in &guards {
            if g.body.iter().any(|b| imports.iter().any(|i| i.stmt == *b)) {
                let start = py.statements[g.open].start;
                let end = py.statements[g.last].end;
                covered(start, end, &mut ranges);
            }
        }
        for imp in &imports {
            let s = &py.statements[imp.stmt];
            covered(s.start, s.end, &mut ranges);
        }
        for s in &py.statements {
            if let PyLine::Registration { target, .. } = &s.kind {
                if bound.iter().any(|b| b == target) {
                    covered(s.start, s.end, &mut ranges);
                }
            }
        }

        if ranges.is_empty() {
            return Ok(MutationResult::unchanged(current));
        }

        let blank = |i: usize| py.lines.get(i).is_none_or(|l| l.trim().is_empty());
        let mut edits = LineEdits::default();
        for (start, end) in ranges {
            // drop one adjoining blank line so removal leaves no double gap
            if start > 0 && blank(start - 1) && blank(end + 1) {
                edits.remove(start - 1, end);
            } else {
                edits.remove(start, end);
            }
        }
        debug!(module = %module.id, file = %self.file, "removed route registration");
        Ok(MutationResult::rewritten(current, edits.apply(&py.lines)))
    }

    fn aggregate_name(py: &PySource) -> Option<String> {
        let declared: Vec<String> = py
            .statements
            .iter()
            .filter(|s| s.kind == PyLine::Other)
            .filter_map(|s| AGGREGATE.captures(&s.code).map(|c| c[1].to_string()))
            .collect();
        let used = py.statements.iter().rev().find_map(|s| match &s.kind {
            PyLine::Registration { aggregate, .. } if declared.contains(aggregate) => {
                Some(aggregate.clone())
            }
            _ => None,
        });
        used.or_else(|| declared.into_iter().next())
    }

    /// Line after the last top-level registration (bare or guarded) on
    /// `aggregate`, or end of file.
    fn registration_anchor(py: &PySource, guards: &[Guard], aggregate: &str) -> Option<usize> {
        let on_aggregate =
            |k: &PyLine| matches!(k, PyLine::Registration { aggregate: a, .. } if a == aggregate);
        let bare = py
            .statements
            .iter()
            .filter(|s| s.is_top_level() && on_aggregate(&s.kind))
            .map(|s| s.end + 1);
        let guarded = guards
            .iter()
            .filter(|g| g.body.iter().any(|&b| on_aggregate(&py.statements[b].kind)))
            .map(|g| py.statements[g.last].end + 1);
        bare.chain(guarded).max()
    }

    fn registration_line(aggregate: &str, target: &str, module: &ModuleDescriptor) -> String {
        let mut line = format!(
            "{}.include_router({}, prefix=\"{}\"",
            aggregate, target, module.route.prefix
        );
        if !module.route.tags.is_empty() {
            let tags: Vec<String> = module
                .route
                .tags
                .iter()
                .map(|t| format!("\"{}\"", t))
                .collect();
            line.push_str(&format!(", tags=[{}]", tags.join(", ")));
        }
        line.push(')');
        line
    }

    /// `try:` block importing the module's router, followed by `body`.
    fn guard_lines(&self, module: &ModuleDescriptor, body: &[String]) -> Vec<String> {
        let mut lines = vec![
            "try:".to_string(),
            format!("{}{}", DEFAULT_INDENT, self.import_line(module)),
            String::new(),
        ];
        lines.extend(body.iter().map(|l| format!("{}{}", DEFAULT_INDENT, l)));
        lines.push("except ImportError:".to_string());
        lines.push(format!("{}pass", DEFAULT_INDENT));
        lines
    }

    fn import_line(&self, module: &ModuleDescriptor) -> String {
        format!(
            "from {} import router as {}",
            module.router_import_path(&self.modules_package),
            module.router_alias()
        )
    }
}

impl SourceMutator for RouteAggregator {
    fn kind(&self) -> MutatorKind {
        MutatorKind::Route
    }

    fn apply(&self, current: &str, module: &ModuleDescriptor) -> Result<MutationResult, DomainError> {
        let (py, guards) = self.parse(current)?;
        let aggregate = Self::aggregate_name(&py).ok_or_else(|| {
            DomainError::parse(&self.file, "no 'APIRouter(' or 'FastAPI(' aggregate found")
        })?;

        let imports = self.find_imports(&py, module);
        let existing = imports.first();
        let bound = existing
            .map(|i| i.bound.clone())
            .unwrap_or_else(|| module.router_alias());
        let registration_stmt = py
            .statements
            .iter()
            .position(|s| Self::is_registration_of(&s.kind, &bound, &module.route.prefix));
        let registered = registration_stmt.is_some();

        if existing.is_some() && registered {
            return Ok(MutationResult::unchanged(current));
        }

        let registration = Self::registration_line(&aggregate, &bound, module);
        let anchor = Self::registration_anchor(&py, &guards, &aggregate);
        let eof = py.lines.len();
        let needs_gap = |at: usize| at > 0 && py.lines.get(at - 1).is_some_and(|l| !l.trim().is_empty());
        let mut edits = LineEdits::default();

        match existing {
            Some(imp) => {
                let guard = guards.iter().find(|g| g.body.contains(&imp.stmt));
                match guard {
                    // guarded import without its registration: complete the guard
                    Some(g) => {
                        let last_body = g.body.iter().copied().max().unwrap_or(imp.stmt);
                        let indent = " ".repeat(py.statements[imp.stmt].indent);
                        edits.insert(
                            py.statements[last_body].end + 1,
                            [format!("{}{}", indent, registration)],
                        );
                    }
                    None => {
                        let at = anchor.unwrap_or(eof);
                        if anchor.is_none() && needs_gap(at) {
                            edits.insert(at, [String::new()]);
                        }
                        edits.insert(at, [registration]);
                    }
                }
            }
            None if module.route.optional => match registration_stmt {
                None => {
                    let at = anchor.unwrap_or(eof);
                    if needs_gap(at) {
                        edits.insert(at, [String::new()]);
                    }
                    edits.insert(at, self.guard_lines(module, &[registration]));
                }
                // registration without its import: the import must share its guard
                Some(r) => {
                    let stmt = &py.statements[r];
                    if guards.iter().any(|g| g.body.contains(&r)) {
                        edits.insert(
                            stmt.start,
                            [format!("{}{}", " ".repeat(stmt.indent), self.import_line(module))],
                        );
                    } else {
                        let body: Vec<String> = py.lines[stmt.start..=stmt.end]
                            .iter()
                            .map(|l| l.trim_end().to_string())
                            .collect();
                        edits.remove(stmt.start, stmt.end);
                        edits.insert(stmt.start, self.guard_lines(module, &body));
                    }
                }
            },
            None => {
                let had_imports = py.after_last_top_level_import().is_some();
                let at = py.import_insertion_point();
                edits.insert(at, [self.import_line(module)]);
                if !had_imports {
                    edits.insert(at, [String::new()]);
                }
                if !registered {
                    let at = anchor.unwrap_or(eof);
                    if anchor.is_none() && needs_gap(at) {
                        edits.insert(at, [String::new()]);
                    }
                    edits.insert(at, [registration]);
                }
            }
        }

        debug!(module = %module.id, file = %self.file, aggregate = %aggregate, "wired route");
        Ok(MutationResult::rewritten(current, edits.apply(&py.lines)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::descriptor::fixtures::descriptor;
    use pretty_assertions::assert_eq;

    const ROUTER: &str = "\
from fastapi import APIRouter

from app.modules.health.router import router as health_router

api_router = APIRouter()

api_router.include_router(health_router, prefix=\"/health\", tags=[\"Health\"])
";

    fn mutator() -> RouteAggregator {
        RouteAggregator::new("app.modules", "app/api/router.py")
    }

    #[test]
    fn adds_import_after_last_import_and_registration_after_last_registration() {
        let users = descriptor("users", &[]);
        let out = mutator().apply(ROUTER, &users).unwrap();
        assert!(out.changed);
        assert_eq!(
            out.new_content,
            "\
from fastapi import APIRouter

from app.modules.health.router import router as health_router
from app.modules.users.router import router as users_router

api_router = APIRouter()

api_router.include_router(health_router, prefix=\"/health\", tags=[\"Health\"])
api_router.include_router(users_router, prefix=\"/users\", tags=[\"users\"])
"
        );
    }

    #[test]
    fn second_apply_is_a_no_op() {
        let users = descriptor("users", &[]);
        let once = mutator().apply(ROUTER, &users).unwrap();
        let twice = mutator().apply(&once.new_content, &users).unwrap();
        assert!(!twice.changed);
        assert_eq!(twice.new_content, once.new_content);
    }

    #[test]
    fn whitespace_variants_are_recognized() {
        let users = descriptor("users", &[]);
        let src = "\
from fastapi import APIRouter
from app.modules.users.router import (
    router   as   users_router,
)

api_router = APIRouter()
api_router.include_router(
    users_router,
    prefix='/users',
)
";
        let out = mutator().apply(src, &users).unwrap();
        assert!(!out.changed);
    }

    #[test]
    fn optional_module_is_guarded() {
        let mut logs = descriptor("logs", &[]);
        logs.route.optional = true;
        let out = mutator().apply(ROUTER, &logs).unwrap();
        assert!(out.new_content.ends_with(
            "\
api_router.include_router(health_router, prefix=\"/health\", tags=[\"Health\"])

try:
    from app.modules.logs.router import router as logs_router

    api_router.include_router(logs_router, prefix=\"/logs\", tags=[\"logs\"])
except ImportError:
    pass
"
        ));
        // the guarded import must not count as a top-level import
        let again = mutator().apply(&out.new_content, &logs).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn existing_guard_gets_missing_registration() {
        let mut logs = descriptor("logs", &[]);
        logs.route.optional = true;
        let src = "\
from fastapi import APIRouter

api_router = APIRouter()

try:
    from app.modules.logs.router import router as logs_router
except ImportError:
    pass
";
        let out = mutator().apply(src, &logs).unwrap();
        assert_eq!(
            out.new_content,
            "\
from fastapi import APIRouter

api_router = APIRouter()

try:
    from app.modules.logs.router import router as logs_router
    api_router.include_router(logs_router, prefix=\"/logs\", tags=[\"logs\"])
except ImportError:
    pass
"
        );
        assert_eq!(out.new_content.matches("try:").count(), 1);
    }

    #[test]
    fn guarded_registration_gets_its_missing_import() {
        let mut logs = descriptor("logs", &[]);
        logs.route.optional = true;
        let src = "\
from fastapi import APIRouter

api_router = APIRouter()

try:
    api_router.include_router(logs_router, prefix=\"/logs\")
except ImportError:
    pass
";
        let out = mutator().apply(src, &logs).unwrap();
        assert_eq!(
            out.new_content,
            "\
from fastapi import APIRouter

api_router = APIRouter()

try:
    from app.modules.logs.router import router as logs_router
    api_router.include_router(logs_router, prefix=\"/logs\")
except ImportError:
    pass
"
        );
        assert!(!mutator().apply(&out.new_content, &logs).unwrap().changed);
    }

    #[test]
    fn bare_registration_of_optional_module_is_moved_into_a_guard() {
        let mut logs = descriptor("logs", &[]);
        logs.route.optional = true;
        let src = "\
from fastapi import APIRouter

api_router = APIRouter()

api_router.include_router(logs_router, prefix=\"/logs\")
";
        let out = mutator().apply(src, &logs).unwrap();
        assert_eq!(
            out.new_content,
            "\
from fastapi import APIRouter

api_router = APIRouter()

try:
    from app.modules.logs.router import router as logs_router

    api_router.include_router(logs_router, prefix=\"/logs\")
except ImportError:
    pass
"
        );
        assert!(!out.new_content.lines().any(|l| l.starts_with("from app.modules.logs")));
        assert!(!mutator().apply(&out.new_content, &logs).unwrap().changed);
    }

    #[test]
    fn crlf_route_file_stays_crlf() {
        let users = descriptor("users", &[]);
        let crlf = ROUTER.replace('\n', "\r\n");
        let out = mutator().apply(&crlf, &users).unwrap();
        assert!(out.changed);
        assert!(!out.new_content.replace("\r\n", "").contains('\n'));
        assert!(out
            .new_content
            .contains("from app.modules.users.router import router as users_router\r\n"));
        assert!(!mutator().apply(&out.new_content, &users).unwrap().changed);
    }

    #[test]
    fn new_top_level_import_never_lands_inside_a_guard() {
        let users = descriptor("users", &[]);
        let src = "\
from fastapi import APIRouter

api_router = APIRouter()

try:
    from app.modules.logs.router import router as logs_router

    api_router.include_router(logs_router, prefix=\"/logs\")
except ImportError:
    pass
";
        let out = mutator().apply(src, &users).unwrap();
        let lines: Vec<&str> = out.new_content.lines().collect();
        assert_eq!(lines[1], "from app.modules.users.router import router as users_router");
        assert_eq!(lines.last().copied(), Some("api_router.include_router(users_router, prefix=\"/users\", tags=[\"users\"])"));
    }

    #[test]
    fn fastapi_app_is_an_aggregate() {
        let users = descriptor("users", &[]);
        let src = "from fastapi import FastAPI\n\napp = FastAPI(title=\"x\")\n";
        let out = mutator().apply(src, &users).unwrap();
        assert!(out.new_content.contains("app.include_router(users_router, prefix=\"/users\""));
    }

    #[test]
    fn missing_aggregate_is_a_parse_error() {
        let users = descriptor("users", &[]);
        let err = mutator().apply("import os\n", &users).unwrap_err();
        assert!(matches!(err, DomainError::Parse { ref file, .. } if file == "app/api/router.py"));
    }

    #[test]
    fn unterminated_bracket_is_a_parse_error() {
        let users = descriptor("users", &[]);
        let src = "from fastapi import APIRouter\napi_router = APIRouter(\n";
        assert!(mutator().apply(src, &users).is_err());
    }

    #[test]
    fn guard_without_handler_is_a_parse_error() {
        let users = descriptor("users", &[]);
        let src = "from fastapi import APIRouter\napi_router = APIRouter()\ntry:\n    import x\n";
        assert!(matches!(
            mutator().apply(src, &users),
            Err(DomainError::Parse { .. })
        ));
    }

    #[test]
    fn unregister_reverses_apply() {
        let users = descriptor("users", &[]);
        let wired = mutator().apply(ROUTER, &users).unwrap();
        assert!(mutator().is_registered(&wired.new_content, &users).unwrap());

        let removed = mutator().unregister(&wired.new_content, &users).unwrap();
        assert!(removed.changed);
        assert_eq!(removed.new_content, ROUTER);
        assert!(!mutator().is_registered(&removed.new_content, &users).unwrap());
    }

    #[test]
    fn unregister_removes_whole_guard() {
        let mut logs = descriptor("logs", &[]);
        logs.route.optional = true;
        let wired = mutator().apply(ROUTER, &logs).unwrap();
        let removed = mutator().unregister(&wired.new_content, &logs).unwrap();
        assert_eq!(removed.new_content, ROUTER);
    }
}
