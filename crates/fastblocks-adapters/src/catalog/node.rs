//! Format-neutral document tree for catalog files.
//!
//! Both JSON and TOML deserialize into [`Node`]. Tables keep their key order
//! and reject duplicate keys, which neither `serde_json::Value` nor
//! `toml::Value` do.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use fastblocks_core::domain::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    Table(Vec<(String, Node)>),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Integer(_) | Node::Float(_) => "number",
            Node::String(_) => "string",
            Node::Array(_) => "array",
            Node::Table(_) => "table",
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a catalog value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(i64::try_from(v).map_or(Node::Float(v as f64), Node::Integer))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries: Vec<(String, Node)> = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate key `{}`", key)));
            }
            let value = map.next_value()?;
            entries.push((key, value));
        }
        Ok(Node::Table(entries))
    }
}

/// A node together with its dotted location in the document.
pub(crate) struct Field<'a> {
    pub path: String,
    pub node: &'a Node,
}

impl<'a> Field<'a> {
    pub fn new(path: impl Into<String>, node: &'a Node) -> Self {
        Self {
            path: path.into(),
            node,
        }
    }

    pub fn error(&self, reason: impl Into<String>) -> DomainError {
        DomainError::InvalidCatalog {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn expected(&self, what: &str) -> DomainError {
        self.error(format!("expected {}, found {}", what, self.node.kind()))
    }

    pub fn table(&self) -> Result<&'a [(String, Node)], DomainError> {
        match self.node {
            Node::Table(entries) => Ok(entries),
            _ => Err(self.expected("table")),
        }
    }

    pub fn string(&self) -> Result<String, DomainError> {
        match self.node {
            Node::String(s) => Ok(s.clone()),
            _ => Err(self.expected("string")),
        }
    }

    /// Environment defaults may be written as bare numbers or booleans.
    pub fn scalar(&self) -> Result<String, DomainError> {
        match self.node {
            Node::String(s) => Ok(s.clone()),
            Node::Integer(i) => Ok(i.to_string()),
            Node::Float(f) => Ok(f.to_string()),
            Node::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            _ => Err(self.expected("string, number or boolean")),
        }
    }

    pub fn boolean(&self) -> Result<bool, DomainError> {
        match self.node {
            Node::Bool(b) => Ok(*b),
            _ => Err(self.expected("boolean")),
        }
    }

    pub fn strings(&self) -> Result<Vec<String>, DomainError> {
        match self.node {
            Node::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Field::new(format!("{}[{}]", self.path, i), item).string())
                .collect(),
            _ => Err(self.expected("array of strings")),
        }
    }
}

/// Table lookups that know the table's own path.
pub(crate) struct Table<'a> {
    pub path: String,
    pub entries: &'a [(String, Node)],
}

impl<'a> Table<'a> {
    pub fn new(path: impl Into<String>, entries: &'a [(String, Node)]) -> Self {
        Self {
            path: path.into(),
            entries,
        }
    }

    pub fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a Node> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .filter(|v| **v != Node::Null)
    }

    pub fn required_string(&self, key: &str) -> Result<String, DomainError> {
        let path = self.child_path(key);
        match self.get(key) {
            Some(node) => Field::new(path.clone(), node).string(),
            None => Err(DomainError::InvalidCatalog {
                path,
                reason: "missing required field".into(),
            }),
        }
    }

    pub fn optional_string(&self, key: &str) -> Result<Option<String>, DomainError> {
        let path = self.child_path(key);
        self.get(key)
            .map(|node| Field::new(path.clone(), node).string())
            .transpose()
    }

    pub fn strings(&self, key: &str) -> Result<Vec<String>, DomainError> {
        let path = self.child_path(key);
        match self.get(key) {
            Some(node) => Field::new(path.clone(), node).strings(),
            None => Ok(Vec::new()),
        }
    }

    pub fn boolean(&self, key: &str) -> Result<bool, DomainError> {
        let path = self.child_path(key);
        match self.get(key) {
            Some(node) => Field::new(path.clone(), node).boolean(),
            None => Ok(false),
        }
    }

    /// Nested table, empty when absent.
    pub fn table(&self, key: &str) -> Result<Table<'a>, DomainError> {
        let path = self.child_path(key);
        let entries = match self.get(key) {
            Some(node) => Field::new(path.clone(), node).table()?,
            None => &[],
        };
        Ok(Table::new(path, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keys_keep_declaration_order() {
        let node: Node = serde_json::from_str(r#"{"b": 1, "a": 2, "c": 3}"#).unwrap();
        let Node::Table(entries) = node else {
            panic!("expected table");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = serde_json::from_str::<Node>(r#"{"a": 1, "a": 2}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate key `a`"));
    }

    #[test]
    fn type_errors_carry_the_field_path() {
        let node: Node = serde_json::from_str(r#"{"tags": ["ok", 3]}"#).unwrap();
        let Node::Table(entries) = &node else {
            panic!("expected table");
        };
        let err = Table::new("modules.auth", entries).strings("tags").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid registry catalog at 'modules.auth.tags[1]': expected string, found number"
        );
    }
}
