//! Line scanner for Python aggregator files.
//!
//! Not a Python parser. It groups physical lines into logical statements
//! (bracket continuations, backslash continuations, triple-quoted strings)
//! and classifies each statement into a [`PyLine`]. That is enough to find
//! imports, `include_router` calls, `try:` guards and class definitions
//! without touching anything else in the file.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^from\s+([\w.]+)\s+import\s+(.+)$").expect("valid from-import regex")
});

static PLAIN_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^import\s+(.+)$").expect("valid import regex"));

static REGISTRATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\.include_router\s*\((.*)\)$").expect("valid registration regex")
});

static PREFIX_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"prefix\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid prefix regex")
});

static CLASS_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)\s*[(:]").expect("valid class regex"));

static GUARD_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:except\b.*|finally\s*):$").expect("valid handler regex"));

/// One imported name, with its optional local alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportName {
    /// The name this import binds locally.
    pub fn bound(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Classification of one logical statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PyLine {
    /// `from <from> import ...` or `import ...` (then `from` is `None`).
    Import {
        from: Option<String>,
        names: Vec<ImportName>,
    },
    /// `try:`
    GuardOpen,
    /// `except ...:` or `finally:`
    GuardHandler,
    /// `<aggregate>.include_router(<target>, prefix=...)`
    Registration {
        aggregate: String,
        target: String,
        prefix: Option<String>,
    },
    ClassDef { name: String },
    Blank,
    Comment,
    Other,
}

/// A logical statement spanning physical lines `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: PyLine,
    pub start: usize,
    pub end: usize,
    pub indent: usize,
    /// Code with comments stripped and whitespace collapsed.
    pub code: String,
}

impl Statement {
    pub fn is_top_level(&self) -> bool {
        self.indent == 0 && self.is_code()
    }

    /// Anything other than blank lines and comments.
    pub fn is_code(&self) -> bool {
        !matches!(self.kind, PyLine::Blank | PyLine::Comment)
    }
}

/// A top-level `try:` block with its handler clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    /// Statement index of `try:`.
    pub open: usize,
    /// Statement indices of the `try` body (code only).
    pub body: Vec<usize>,
    /// Statement index of the first handler.
    pub handler: usize,
    /// Statement index of the last code statement of the whole block.
    pub last: usize,
}

/// A scanned Python file.
#[derive(Debug, Clone)]
pub struct PySource {
    pub lines: Vec<String>,
    pub statements: Vec<Statement>,
}

impl PySource {
    /// Scan `content`; fails on unbalanced brackets or unterminated strings.
    pub fn scan(content: &str) -> Result<Self, String> {
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let mut statements = Vec::new();
        let mut state = LexState::default();
        let mut current: Option<(usize, Vec<String>)> = None;

        for (i, line) in lines.iter().enumerate() {
            let code = state.feed(line, i + 1)?;
            let (start, mut parts) = current.take().unwrap_or((i, Vec::new()));
            parts.push(code);
            if state.continues() {
                current = Some((start, parts));
                continue;
            }
            let first = &lines[start];
            let indent = first.len() - first.trim_start().len();
            let code = collapse_whitespace(&parts.join(" "));
            let kind = classify(first.trim_start(), &code);
            statements.push(Statement {
                kind,
                start,
                end: i,
                indent,
                code,
            });
        }

        if let Some((start, _)) = current {
            return Err(format!(
                "unterminated bracket or string starting at line {}",
                start + 1
            ));
        }

        Ok(Self { lines, statements })
    }

    /// Every top-level `try:` block. A `try:` with no handler is an error.
    pub fn guards(&self) -> Result<Vec<Guard>, String> {
        let mut guards = Vec::new();
        let stmts = &self.statements;
        let mut i = 0;
        while i < stmts.len() {
            if !(stmts[i].is_top_level() && stmts[i].kind == PyLine::GuardOpen) {
                i += 1;
                continue;
            }
            let open = i;
            let mut body = Vec::new();
            let mut j = i + 1;
            while j < stmts.len() && !stmts[j].is_top_level() {
                if stmts[j].is_code() {
                    body.push(j);
                }
                j += 1;
            }
            if j >= stmts.len() || stmts[j].kind != PyLine::GuardHandler {
                return Err(format!(
                    "'try:' at line {} has no except clause",
                    stmts[open].start + 1
                ));
            }
            let handler = j;
            let mut last = j;
            // handler clauses, each followed by its indented body
            while j < stmts.len() {
                let s = &stmts[j];
                if s.is_top_level() && s.kind != PyLine::GuardHandler && s.code != "else:" {
                    break;
                }
                if s.is_code() {
                    last = j;
                }
                j += 1;
            }
            guards.push(Guard {
                open,
                body,
                handler,
                last,
            });
            i = j;
        }
        Ok(guards)
    }

    /// Line index just past the last top-level import, if any.
    pub fn after_last_top_level_import(&self) -> Option<usize> {
        self.statements
            .iter()
            .filter(|s| s.is_top_level() && matches!(s.kind, PyLine::Import { .. }))
            .map(|s| s.end + 1)
            .next_back()
    }

    /// Where a new top-level import goes: after the last one, else after
    /// the leading comment/docstring block.
    pub fn import_insertion_point(&self) -> usize {
        if let Some(at) = self.after_last_top_level_import() {
            return at;
        }
        self.statements
            .iter()
            .find(|s| s.is_code() && !is_docstring(&s.code))
            .map(|s| s.start)
            .unwrap_or(self.lines.len())
    }

    pub fn top_level_imports(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|s| s.is_top_level() && matches!(s.kind, PyLine::Import { .. }))
    }

    pub fn class_def(&self, name: &str) -> Option<usize> {
        self.statements.iter().position(|s| {
            s.is_top_level() && matches!(&s.kind, PyLine::ClassDef { name: n } if n == name)
        })
    }

    /// Code statements of the indented body following statement `idx`.
    pub fn block_body(&self, idx: usize) -> Vec<usize> {
        self.statements[idx + 1..]
            .iter()
            .enumerate()
            .take_while(|(_, s)| !s.is_top_level())
            .filter(|(_, s)| s.is_code())
            .map(|(off, _)| idx + 1 + off)
            .collect()
    }
}

/// Render with inserted and removed lines.
///
/// Inserts at the same index keep the order they were added in. Removed
/// ranges are inclusive; an insert at the first line of a removed range
/// takes its place.
#[derive(Debug, Default)]
pub struct LineEdits {
    inserts: BTreeMap<usize, Vec<String>>,
    removes: Vec<(usize, usize)>,
}

impl LineEdits {
    pub fn insert(&mut self, at: usize, lines: impl IntoIterator<Item = String>) {
        self.inserts.entry(at).or_default().extend(lines);
    }

    pub fn remove(&mut self, start: usize, end: usize) {
        self.removes.push((start, end));
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.removes.is_empty()
    }

    pub fn apply(self, lines: &[String]) -> String {
        let removed = |i: usize| self.removes.iter().any(|&(s, e)| i >= s && i <= e);
        let mut out: Vec<&str> = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if let Some(new) = self.inserts.get(&i) {
                out.extend(new.iter().map(String::as_str));
            }
            if !removed(i) {
                out.push(line);
            }
        }
        if let Some(tail) = self.inserts.range(lines.len()..).next().map(|(_, v)| v) {
            out.extend(tail.iter().map(String::as_str));
        }
        let mut text = out.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

#[derive(Debug, Default)]
struct LexState {
    depth: i32,
    /// Open string: quote char and whether it is triple-quoted.
    string: Option<(char, bool)>,
    backslash: bool,
}

impl LexState {
    fn continues(&self) -> bool {
        self.depth > 0 || self.string.is_some() || self.backslash
    }

    /// Consume one physical line; returns its code with comments removed.
    fn feed(&mut self, line: &str, lineno: usize) -> Result<String, String> {
        let chars: Vec<char> = line.chars().collect();
        let mut code = String::with_capacity(line.len());
        self.backslash = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if let Some((q, triple)) = self.string {
                code.push(c);
                if c == '\\' && i + 1 < chars.len() {
                    code.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                if c == q {
                    if !triple {
                        self.string = None;
                    } else if chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q) {
                        code.push(q);
                        code.push(q);
                        i += 2;
                        self.string = None;
                    }
                }
                i += 1;
                continue;
            }
            match c {
                '#' => break,
                '"' | '\'' => {
                    let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                    self.string = Some((c, triple));
                    code.push(c);
                    if triple {
                        code.push(c);
                        code.push(c);
                        i += 2;
                    }
                }
                '(' | '[' | '{' => {
                    self.depth += 1;
                    code.push(c);
                }
                ')' | ']' | '}' => {
                    self.depth -= 1;
                    if self.depth < 0 {
                        return Err(format!("unbalanced '{}' at line {}", c, lineno));
                    }
                    code.push(c);
                }
                '\\' if i + 1 == chars.len() => self.backslash = true,
                _ => code.push(c),
            }
            i += 1;
        }
        // single-quoted strings cannot span lines
        if matches!(self.string, Some((_, false))) {
            self.string = None;
        }
        Ok(code)
    }
}

fn classify(raw: &str, code: &str) -> PyLine {
    if raw.is_empty() {
        return PyLine::Blank;
    }
    if code.is_empty() {
        return PyLine::Comment;
    }
    if code == "try:" {
        return PyLine::GuardOpen;
    }
    if GUARD_HANDLER.is_match(code) {
        return PyLine::GuardHandler;
    }
    if let Some(caps) = FROM_IMPORT.captures(code) {
        return PyLine::Import {
            from: Some(caps[1].to_string()),
            names: parse_import_names(&caps[2]),
        };
    }
    if let Some(caps) = PLAIN_IMPORT.captures(code) {
        return PyLine::Import {
            from: None,
            names: parse_import_names(&caps[1]),
        };
    }
    if let Some(caps) = REGISTRATION.captures(code) {
        let args = &caps[2];
        let target = args.split(',').next().unwrap_or("").trim().to_string();
        let prefix = PREFIX_ARG.captures(args).and_then(|p| {
            p.get(1)
                .or_else(|| p.get(2))
                .map(|m| m.as_str().to_string())
        });
        return PyLine::Registration {
            aggregate: caps[1].to_string(),
            target,
            prefix,
        };
    }
    if let Some(caps) = CLASS_DEF.captures(code) {
        return PyLine::ClassDef {
            name: caps[1].to_string(),
        };
    }
    PyLine::Other
}

fn parse_import_names(list: &str) -> Vec<ImportName> {
    list.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            let mut parts = item.split_whitespace();
            let name = parts.next().unwrap_or_default().to_string();
            let alias = match (parts.next(), parts.next()) {
                (Some("as"), Some(a)) => Some(a.to_string()),
                _ => None,
            };
            ImportName { name, alias }
        })
        .collect()
}

fn is_docstring(code: &str) -> bool {
    code.starts_with("\"\"\"") || code.starts_with("'''")
}

/// Collapse runs of whitespace to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn multi_line_import_is_one_statement() {
        let src = "from app.modules.auth.router import (\n    router as auth_router,  # auth\n)\nx = 1\n";
        let py = PySource::scan(src).unwrap();
        assert_eq!(py.statements.len(), 2);
        let first = &py.statements[0];
        assert_eq!((first.start, first.end), (0, 2));
        assert_eq!(
            first.kind,
            PyLine::Import {
                from: Some("app.modules.auth.router".into()),
                names: vec![ImportName {
                    name: "router".into(),
                    alias: Some("auth_router".into())
                }],
            }
        );
    }

    #[test]
    fn registration_extracts_target_and_prefix() {
        let src = "api_router.include_router(\n    users_router,\n    prefix='/users',\n    tags=[\"Users\"],\n)\n";
        let py = PySource::scan(src).unwrap();
        assert_eq!(
            py.statements[0].kind,
            PyLine::Registration {
                aggregate: "api_router".into(),
                target: "users_router".into(),
                prefix: Some("/users".into()),
            }
        );
    }

    #[test]
    fn brackets_inside_strings_and_comments_are_ignored() {
        let src = "x = \"(\"  # )\ny = ')'\n";
        let py = PySource::scan(src).unwrap();
        assert_eq!(py.statements.len(), 2);
    }

    #[test]
    fn docstring_spans_lines() {
        let src = "\"\"\"Top docstring\n(with a bracket\n\"\"\"\nimport os\n";
        let py = PySource::scan(src).unwrap();
        assert_eq!(py.statements.len(), 2);
        assert_eq!(py.import_insertion_point(), 4);
    }

    #[test]
    fn unterminated_bracket_is_an_error() {
        let err = PySource::scan("foo = bar(\n    1,\n").unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn guard_without_handler_is_an_error() {
        let py = PySource::scan("try:\n    import x\ny = 1\n").unwrap();
        assert!(py.guards().is_err());
    }

    #[test]
    fn guard_spans_handler_body() {
        let src = "try:\n    import x\n\n    x.go()\nexcept ImportError:\n    pass\nz = 1\n";
        let py = PySource::scan(src).unwrap();
        let guards = py.guards().unwrap();
        assert_eq!(guards.len(), 1);
        let g = &guards[0];
        assert_eq!(g.body.len(), 2);
        assert_eq!(py.statements[g.last].end, 5);
    }

    #[test]
    fn edits_keep_insert_order_and_trailing_newline() {
        let lines: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let mut edits = LineEdits::default();
        edits.insert(1, ["x".to_string()]);
        edits.insert(1, ["y".to_string()]);
        edits.remove(2, 2);
        edits.insert(3, ["end".to_string()]);
        assert_eq!(edits.apply(&lines), "a\nx\ny\nb\nend\n");
    }
}
