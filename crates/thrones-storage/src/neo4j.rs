//! Neo4j backend over the Bolt protocol.
//!
//! One [`neo4rs::Graph`] handle (internally pooled) is shared by every
//! session. Each named query runs its Cypher text with parameters bound by
//! name; the returned rows are decoded into [`Record`]s column by column.

use crate::backend::{GraphBackend, GraphSession, GraphTransaction};
use crate::config::DatabaseConfig;
use crate::StorageError;
use async_trait::async_trait;
use neo4rs::{query, BoltNull, BoltType, ConfigBuilder, Graph, Query, Row, Txn};
use std::collections::BTreeMap;
use thrones_core::{AccessMode, InternalId, NamedQuery, Node, Record, Value};

pub struct Neo4jBackend {
    graph: Graph,
}

impl Neo4jBackend {
    /// Builds the connection pool.
    ///
    /// The database name is only selected for engines that host several
    /// databases; older engines always use the server default.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.url.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if config.selects_database() {
            builder = builder.db(config.database.as_str());
        }

        let bolt_config = builder
            .build()
            .map_err(|e| StorageError::Unavailable(format!("invalid connection settings: {}", e)))?;
        let graph = Graph::connect(bolt_config)
            .await
            .map_err(|e| StorageError::Unavailable(format!("cannot reach {}: {}", config.url, e)))?;

        tracing::info!(
            url = %config.url,
            database = if config.selects_database() { config.database.as_str() } else { "<default>" },
            "Connected to Neo4j"
        );
        Ok(Self { graph })
    }
}

#[async_trait]
impl GraphBackend for Neo4jBackend {
    fn kind(&self) -> &'static str {
        "neo4j"
    }

    async fn open_session(&self) -> Result<Box<dyn GraphSession>, StorageError> {
        Ok(Box::new(Neo4jSession {
            graph: self.graph.clone(),
        }))
    }
}

struct Neo4jSession {
    graph: Graph,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn begin(&mut self, mode: AccessMode) -> Result<Box<dyn GraphTransaction>, StorageError> {
        let txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(Box::new(Neo4jTransaction { txn, mode }))
    }

    async fn close(self: Box<Self>) -> Result<(), StorageError> {
        // Connections return to the pool when their transaction ends.
        Ok(())
    }
}

struct Neo4jTransaction {
    txn: Txn,
    mode: AccessMode,
}

#[async_trait]
impl GraphTransaction for Neo4jTransaction {
    async fn run(&mut self, named: &NamedQuery) -> Result<Vec<Record>, StorageError> {
        if named.access() == AccessMode::Write && self.mode == AccessMode::Read {
            return Err(StorageError::AccessDenied {
                query: named.name(),
                mode: self.mode,
            });
        }

        let failed = |e: neo4rs::Error| StorageError::Query {
            query: named.name(),
            message: e.to_string(),
        };

        let mut stream = self.txn.execute(bind(named)?).await.map_err(failed)?;
        let mut records = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await.map_err(failed)? {
            records.push(decode_row(named, &row)?);
        }
        Ok(records)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.txn.commit().await.map_err(|e| StorageError::Query {
            query: "commit",
            message: e.to_string(),
        })
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.txn.rollback().await.map_err(|e| StorageError::Query {
            query: "rollback",
            message: e.to_string(),
        })
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Cypher text of `named` with every parameter bound.
pub fn bind(named: &NamedQuery) -> Result<Query, StorageError> {
    named
        .params()
        .into_iter()
        .try_fold(query(named.cypher()), |q, (name, value)| {
            Ok(q.param(name, to_bolt(named.name(), &value)?))
        })
}

fn to_bolt(query: &'static str, value: &Value) -> Result<BoltType, StorageError> {
    Ok(match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::String(s) => s.as_str().into(),
        other => {
            return Err(StorageError::Query {
                query,
                message: format!("{} values cannot be bound as parameters", other.kind()),
            });
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    /// A node, or null from an `OPTIONAL MATCH`.
    Node,
    /// `collect(n)`
    Nodes,
    Scalar,
}

fn column_kind(named: &NamedQuery, column: &str) -> ColumnKind {
    match (named, column) {
        (_, "house" | "person" | "region") => ColumnKind::Node,
        (NamedQuery::TopHouses { .. } | NamedQuery::SearchHouses { .. }, "seats") => ColumnKind::Nodes,
        _ => ColumnKind::Scalar,
    }
}

fn decode_row(named: &NamedQuery, row: &Row) -> Result<Record, StorageError> {
    let malformed = |column: &str, e: &dyn std::fmt::Display| StorageError::Query {
        query: named.name(),
        message: format!("cannot decode column '{}': {}", column, e),
    };

    let mut record = Record::new();
    for column in named.columns() {
        let value = match column_kind(named, column) {
            ColumnKind::Node => match row.get::<Option<neo4rs::Node>>(column) {
                Ok(Some(node)) => Value::Node(from_bolt_node(named, &node)?),
                Ok(None) => Value::Null,
                Err(e) => return Err(malformed(column, &e)),
            },
            ColumnKind::Nodes => {
                let nodes = row.get::<Vec<neo4rs::Node>>(column).map_err(|e| malformed(column, &e))?;
                Value::List(
                    nodes
                        .iter()
                        .map(|n| from_bolt_node(named, n).map(Value::Node))
                        .collect::<Result<_, _>>()?,
                )
            }
            ColumnKind::Scalar => row.get::<Value>(column).map_err(|e| malformed(column, &e))?,
        };
        record.insert(*column, value);
    }
    Ok(record)
}

fn from_bolt_node(named: &NamedQuery, node: &neo4rs::Node) -> Result<Node, StorageError> {
    let mut properties = BTreeMap::new();
    for key in node.keys() {
        let value = node.get::<Value>(key).map_err(|e| StorageError::Query {
            query: named.name(),
            message: format!("cannot decode property '{}' of node {}: {}", key, node.id(), e),
        })?;
        properties.insert(key.to_string(), value);
    }

    Ok(Node {
        id: InternalId(node.id()),
        labels: node.labels().into_iter().map(|l| l.to_string()).collect(),
        properties,
    })
}
