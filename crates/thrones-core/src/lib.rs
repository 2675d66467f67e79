//! # Thrones Core
//!
//! Core types shared by every crate of the Westeros graph service.
//!
//! This crate provides:
//! - [`InternalId`] - engine-assigned record identifiers
//! - [`Value`], [`Node`] and [`Record`] - the raw shape of query results
//! - [`NamedQuery`] - the fixed catalog of parameterized graph queries
//! - [`House`], [`Region`], [`Seat`], [`Person`] - projected entities

pub mod entity;
pub mod projection;
pub mod query;

pub use entity::{House, NewCharacter, Person, Region, Seat};
pub use projection::{Projection, ProjectionError};
pub use query::{AccessMode, NamedQuery, SEARCH_LIMIT, TOP_HOUSES_LIMIT};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

/// Engine-assigned identifier of a node.
///
/// Distinct from the `id` property that seeded entities carry. Dynamically
/// created persons only have this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct InternalId(pub i64);

impl InternalId {
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for InternalId {
    #[inline]
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// =============================================================================
// Values
// =============================================================================

/// A raw value returned by the graph store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Only produced by backends, never parsed from property JSON.
    #[serde(skip_deserializing)]
    Node(Node),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Node(_) => "node",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<InternalId> for Value {
    fn from(v: InternalId) -> Self {
        Value::Int(v.as_i64())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// A graph node as returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: InternalId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<InternalId>, labels: Vec<String>) -> Self {
        Self {
            id: id.into(),
            labels,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

// =============================================================================
// Records
// =============================================================================

/// Errors raised while reading columns out of a [`Record`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("column '{0}' missing from record")]
    MissingColumn(String),
    #[error("column '{column}' expected {expected}, found {found}")]
    UnexpectedKind {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// One result row: column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Result<&Value, RecordError> {
        self.fields
            .get(column)
            .ok_or_else(|| RecordError::MissingColumn(column.to_string()))
    }

    pub fn node(&self, column: &str) -> Result<&Node, RecordError> {
        match self.get(column)? {
            Value::Node(node) => Ok(node),
            other => Err(unexpected(column, "node", other)),
        }
    }

    /// A nullable node column, as produced by `OPTIONAL MATCH`.
    pub fn optional_node(&self, column: &str) -> Result<Option<&Node>, RecordError> {
        match self.get(column)? {
            Value::Null => Ok(None),
            Value::Node(node) => Ok(Some(node)),
            other => Err(unexpected(column, "node or null", other)),
        }
    }

    /// A list-of-nodes column, as produced by `collect(n)`.
    pub fn nodes(&self, column: &str) -> Result<Vec<&Node>, RecordError> {
        match self.get(column)? {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .iter()
                .map(|item| item.as_node().ok_or_else(|| unexpected(column, "list of nodes", item)))
                .collect(),
            other => Err(unexpected(column, "list of nodes", other)),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64, RecordError> {
        let value = self.get(column)?;
        value.as_int().ok_or_else(|| unexpected(column, "int", value))
    }

    pub fn bool(&self, column: &str) -> Result<bool, RecordError> {
        let value = self.get(column)?;
        value.as_bool().ok_or_else(|| unexpected(column, "bool", value))
    }

    pub fn internal_id(&self, column: &str) -> Result<InternalId, RecordError> {
        self.int(column).map(InternalId::new)
    }
}

fn unexpected(column: &str, expected: &'static str, found: &Value) -> RecordError {
    RecordError::UnexpectedKind {
        column: column.to_string(),
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_json_is_plain() {
        let v = Value::from(vec!["Winter is Coming", "Ours is the Fury"]);
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"["Winter is Coming","Ours is the Fury"]"#
        );
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn test_value_from_json_properties() {
        let v: Value = serde_json::from_str(r#"{"id": 1, "name": "The North", "tags": [true, 2.5]}"#).unwrap();
        let Value::Map(map) = v else {
            panic!("expected map");
        };
        assert_eq!(map["id"], Value::Int(1));
        assert_eq!(map["name"], Value::from("The North"));
        assert_eq!(map["tags"], Value::List(vec![Value::Bool(true), Value::Float(2.5)]));
    }

    #[test]
    fn test_record_columns() {
        let node = Node::new(3, vec!["Region".into()]).with_property("name", "The Reach");
        let record = Record::new()
            .with("region", Value::Node(node))
            .with("internal_id", 3i64)
            .with("missing", Value::Null);

        assert_eq!(record.node("region").unwrap().id, InternalId(3));
        assert_eq!(record.internal_id("internal_id").unwrap(), InternalId(3));
        assert_eq!(record.optional_node("missing").unwrap(), None);
        assert!(record.nodes("missing").unwrap().is_empty());
        assert_eq!(
            record.node("nope"),
            Err(RecordError::MissingColumn("nope".into()))
        );
        assert!(matches!(
            record.int("region"),
            Err(RecordError::UnexpectedKind { expected: "int", found: "node", .. })
        ));
    }
}
