//! The seam between the executor and a concrete graph store.
//!
//! A backend hands out sessions, a session opens transactions, and a
//! transaction runs named queries. Transactions are consumed by `commit` or
//! `rollback`; dropping one without either discards its work.

use crate::StorageError;
use async_trait::async_trait;
use thrones_core::{AccessMode, NamedQuery, Record};

#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Short name used in logs and the health payload.
    fn kind(&self) -> &'static str;

    /// Opens a session bound to the configured database.
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, StorageError>;
}

#[async_trait]
pub trait GraphSession: Send {
    async fn begin(&mut self, mode: AccessMode) -> Result<Box<dyn GraphTransaction>, StorageError>;

    async fn close(self: Box<Self>) -> Result<(), StorageError>;
}

#[async_trait]
pub trait GraphTransaction: Send {
    /// Runs the query and materializes every record.
    async fn run(&mut self, query: &NamedQuery) -> Result<Vec<Record>, StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
