//! # Thrones Storage
//!
//! Graph store access for the Westeros service.
//!
//! - [`backend`] - the object-safe seam every store implements
//! - [`neo4j`] - Bolt client over a shared `neo4rs` connection pool
//! - [`memory`] - in-process graph evaluating the query catalog natively
//! - [`transaction`] - buffer-then-apply transactions for the memory store
//! - [`fixture`] - JSON seed files for the memory store
//! - [`config`], [`logging`], [`metrics`] - process-wide ambient concerns

pub mod backend;
pub mod config;
pub mod fixture;
pub mod logging;
pub mod memory;
pub mod metrics;
pub mod neo4j;
pub mod transaction;

pub use backend::{GraphBackend, GraphSession, GraphTransaction};
pub use config::{
    BackendKind, ConfigError, DatabaseConfig, LoggingConfig, MissingParamPolicy, ServerConfig, ThronesConfig,
};
pub use fixture::{Fixture, FixtureError};
pub use memory::{MemoryBackend, MemoryGraph};
pub use metrics::{Metrics, MetricsError, QueryOutcome};
pub use neo4j::Neo4jBackend;
pub use transaction::{Mutation, TransactionError, TransactionManager};

use std::sync::Arc;
use thiserror::Error;
use thrones_core::AccessMode;

/// Errors raised by graph backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("graph database unavailable: {0}")]
    Unavailable(String),

    #[error("query '{query}' cannot run in a {mode} transaction")]
    AccessDenied { query: &'static str, mode: AccessMode },

    #[error("query '{query}' failed: {message}")]
    Query { query: &'static str, message: String },

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),
}

impl StorageError {
    /// True when the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Builds the backend selected by the configuration.
pub async fn open_backend(config: &DatabaseConfig) -> Result<Arc<dyn GraphBackend>, StorageError> {
    match config.backend {
        BackendKind::Neo4j => Ok(Arc::new(Neo4jBackend::connect(config).await?)),
        BackendKind::Memory => {
            let graph = match config.fixture.as_deref() {
                Some(path) if !path.is_empty() => fixture::load_fixture(path)?,
                _ => MemoryGraph::new(),
            };
            tracing::info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "In-memory graph ready"
            );
            Ok(Arc::new(MemoryBackend::new(graph)))
        }
    }
}
