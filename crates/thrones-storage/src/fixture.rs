//! JSON seed files for the memory backend.
//!
//! ```json
//! { "nodes": [ {"labels": ["Region"], "properties": {"id": 1, "name": "The North"}} ],
//!   "edges": [ {"source": 3, "target": 0, "type": "IN_REGION"} ] }
//! ```
//!
//! Nodes receive internal ids in file order starting at 0; edges refer to them.

use crate::memory::MemoryGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use thrones_core::{InternalId, Value};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse fixture: {0}")]
    Json(#[from] serde_json::Error),

    #[error("edge {index} references unknown node ({from} -> {to})")]
    InvalidEdge { index: usize, from: i64, to: i64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub nodes: Vec<FixtureNode>,
    #[serde(default)]
    pub edges: Vec<FixtureEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureNode {
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureEdge {
    pub source: i64,
    pub target: i64,
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl Fixture {
    pub fn parse(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the graph, validating every edge endpoint.
    pub fn into_graph(self) -> Result<MemoryGraph, FixtureError> {
        let mut graph = MemoryGraph::new();
        for node in self.nodes {
            graph.add_node(node.labels, node.properties);
        }
        for (index, edge) in self.edges.into_iter().enumerate() {
            graph
                .add_edge(InternalId(edge.source), InternalId(edge.target), edge.rel_type)
                .map_err(|_| FixtureError::InvalidEdge {
                    index,
                    from: edge.source,
                    to: edge.target,
                })?;
        }
        Ok(graph)
    }
}

/// Reads and builds the fixture at `path`.
pub fn load_fixture(path: impl AsRef<Path>) -> Result<MemoryGraph, FixtureError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let graph = Fixture::parse(&contents)?.into_graph()?;
    tracing::debug!(path = %path.display(), "Loaded fixture");
    Ok(graph)
}
