//! # Thrones Executor
//!
//! Runs catalog queries for HTTP requests.
//!
//! - [`SessionProvider`] hands out one graph session per request
//! - [`QueryExecutor`] runs a query inside a read or write transaction with a deadline
//! - [`RequestContext`] owns the request's session and exposes the typed operations

pub mod executor;
pub mod operations;
pub mod session;

pub use executor::QueryExecutor;
pub use session::{RequestContext, RequestScope, SessionProvider};

use std::time::Duration;
use thiserror::Error;
use thrones_core::{ProjectionError, RecordError};
use thrones_storage::StorageError;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The query did not finish before its deadline
    #[error("query '{query}' exceeded its {after:?} deadline")]
    Timeout { query: &'static str, after: Duration },

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// A referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A query that always yields a row yielded none
    #[error("query '{0}' returned no rows")]
    EmptyResult(&'static str),
}

impl From<RecordError> for ExecutionError {
    fn from(e: RecordError) -> Self {
        ExecutionError::Projection(e.into())
    }
}

/// Result type for execution operations.
pub type Result<T> = std::result::Result<T, ExecutionError>;
