//! Transactions for the in-memory graph.
//!
//! Mutations are buffered in the [`Transaction`] and applied to the graph only
//! on commit. Rollback discards the buffer, so nothing a failed or read-only
//! transaction did is ever visible.
//!
//! 1. `begin`: the manager hands out a new id.
//! 2. Mutations (`CreateNode`/`CreateEdge`) are buffered.
//! 3. `commit`: every buffered mutation is applied in order.
//! 4. `rollback`: the buffer is dropped.

use crate::memory::MemoryGraph;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use thrones_core::{AccessMode, InternalId, Value};

pub type TransactionId = u64;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Transaction {0} is not active")]
    NotActive(TransactionId),
    #[error("Transaction {0} is read-only")]
    ReadOnly(TransactionId),
    #[error("Storage application error: {0}")]
    StorageError(String),
}

/// A buffered change to the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateNode {
        id: InternalId,
        labels: Vec<String>,
        properties: BTreeMap<String, Value>,
    },
    CreateEdge {
        source: InternalId,
        target: InternalId,
        rel_type: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

pub struct Transaction {
    id: TransactionId,
    mode: AccessMode,
    state: TransactionState,
    buffer: Vec<Mutation>,
    pub pending_node_count: usize,
}

impl Transaction {
    pub fn new(id: TransactionId, mode: AccessMode) -> Self {
        Self {
            id,
            mode,
            state: TransactionState::Active,
            buffer: Vec::new(),
            pending_node_count: 0,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Mutations buffered so far, in order.
    pub fn pending(&self) -> &[Mutation] {
        &self.buffer
    }

    /// Buffers a mutation for execution on commit.
    pub fn buffer(&mut self, mutation: Mutation) -> Result<(), TransactionError> {
        if self.state != TransactionState::Active {
            return Err(TransactionError::NotActive(self.id));
        }
        if self.mode == AccessMode::Read {
            return Err(TransactionError::ReadOnly(self.id));
        }
        if matches!(mutation, Mutation::CreateNode { .. }) {
            self.pending_node_count += 1;
        }
        self.buffer.push(mutation);
        Ok(())
    }

    /// Applies every buffered mutation to the graph.
    ///
    /// On failure the graph may hold a prefix of the buffer; callers apply to
    /// a graph they exclusively own.
    pub fn commit(&mut self, graph: &mut MemoryGraph) -> Result<(), TransactionError> {
        if self.state != TransactionState::Active {
            return Err(TransactionError::NotActive(self.id));
        }

        for mutation in &self.buffer {
            graph.apply(mutation).map_err(TransactionError::StorageError)?;
        }

        self.state = TransactionState::Committed;
        self.buffer.clear();
        self.pending_node_count = 0;
        Ok(())
    }

    /// Ends a read-only transaction. Nothing can have been buffered.
    pub fn release(&mut self) -> Result<(), TransactionError> {
        if self.state != TransactionState::Active {
            return Err(TransactionError::NotActive(self.id));
        }
        self.state = TransactionState::Committed;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<(), TransactionError> {
        if self.state != TransactionState::Active {
            return Err(TransactionError::NotActive(self.id));
        }
        self.state = TransactionState::Aborted;
        self.buffer.clear();
        self.pending_node_count = 0;
        Ok(())
    }
}

/// Hands out transaction ids.
#[derive(Debug)]
pub struct TransactionManager {
    next_tx_id: AtomicU64,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_tx_id: AtomicU64::new(1),
        }
    }

    pub fn begin(&self, mode: AccessMode) -> Transaction {
        let id = self.next_tx_id.fetch_add(1, Ordering::SeqCst);
        Transaction::new(id, mode)
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: i64) -> Mutation {
        Mutation::CreateNode {
            id: InternalId(id),
            labels: vec!["Person".into()],
            properties: BTreeMap::from([("name".to_string(), Value::from("Hodor"))]),
        }
    }

    #[test]
    fn test_commit_applies_buffer() {
        let mut graph = MemoryGraph::new();
        let manager = TransactionManager::new();
        let mut tx = manager.begin(AccessMode::Write);

        tx.buffer(person(0)).unwrap();
        assert_eq!(tx.pending_node_count, 1);
        assert_eq!(graph.node_count(), 0);

        tx.commit(&mut graph).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(tx.state(), TransactionState::Committed);
    }

    #[test]
    fn test_rollback_discards_buffer() {
        let graph = MemoryGraph::new();
        let mut tx = TransactionManager::new().begin(AccessMode::Write);
        tx.buffer(person(0)).unwrap();
        tx.rollback().unwrap();

        assert_eq!(graph.node_count(), 0);
        assert!(tx.pending().is_empty());
        assert_eq!(tx.state(), TransactionState::Aborted);
    }

    #[test]
    fn test_read_transactions_refuse_mutations() {
        let mut tx = TransactionManager::new().begin(AccessMode::Read);
        assert!(matches!(tx.buffer(person(0)), Err(TransactionError::ReadOnly(_))));
        tx.release().unwrap();
    }

    #[test]
    fn test_finished_transaction_is_inactive() {
        let mut graph = MemoryGraph::new();
        let mut tx = TransactionManager::new().begin(AccessMode::Write);
        tx.commit(&mut graph).unwrap();
        assert!(matches!(tx.rollback(), Err(TransactionError::NotActive(_))));
        assert!(matches!(tx.buffer(person(0)), Err(TransactionError::NotActive(_))));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let manager = TransactionManager::new();
        let a = manager.begin(AccessMode::Read);
        let b = manager.begin(AccessMode::Write);
        assert!(b.id() > a.id());
    }
}
