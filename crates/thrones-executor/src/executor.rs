//! Query executor.
//!
//! Every call opens a dedicated transaction on the caller's session:
//! reads are always rolled back, writes commit on success and roll back on
//! error. The deadline covers begin, run and the final commit or rollback.
//! Nothing is retried.

use crate::{ExecutionError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thrones_core::{AccessMode, NamedQuery, Record};
use thrones_storage::{GraphSession, GraphTransaction, Metrics, QueryOutcome, StorageError};

pub struct QueryExecutor {
    deadline: Duration,
    metrics: Arc<Metrics>,
}

impl QueryExecutor {
    pub fn new(deadline: Duration, metrics: Arc<Metrics>) -> Self {
        Self { deadline, metrics }
    }

    pub async fn run_read(&self, session: &mut dyn GraphSession, query: &NamedQuery) -> Result<Vec<Record>> {
        self.execute(session, query, AccessMode::Read).await
    }

    pub async fn run_write(&self, session: &mut dyn GraphSession, query: &NamedQuery) -> Result<Vec<Record>> {
        self.execute(session, query, AccessMode::Write).await
    }

    async fn execute(&self, session: &mut dyn GraphSession, query: &NamedQuery, mode: AccessMode) -> Result<Vec<Record>> {
        let started = Instant::now();
        // Holds the transaction until it is handed to commit or rollback.
        let mut slot: Option<Box<dyn GraphTransaction>> = None;

        let outcome = tokio::time::timeout(self.deadline, async {
            let records = slot.insert(session.begin(mode).await?).run(query).await?;
            if let Some(tx) = slot.take() {
                finish(tx, mode).await?;
            }
            Ok::<_, StorageError>(records)
        })
        .await;

        let result = match outcome {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(e)) => {
                self.abandon(slot.take(), query).await;
                Err(ExecutionError::Storage(e))
            }
            Err(_) => {
                self.abandon(slot.take(), query).await;
                Err(ExecutionError::Timeout {
                    query: query.name(),
                    after: self.deadline,
                })
            }
        };

        let elapsed = started.elapsed();
        let status = match &result {
            Ok(_) => QueryOutcome::Ok,
            Err(ExecutionError::Timeout { .. }) => QueryOutcome::Timeout,
            Err(_) => QueryOutcome::Error,
        };
        self.metrics.record_query(query.name(), status, elapsed);

        match &result {
            Ok(records) => tracing::debug!(
                query = query.name(),
                mode = %mode,
                rows = records.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Query executed"
            ),
            Err(e) => tracing::warn!(
                query = query.name(),
                mode = %mode,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Query failed"
            ),
        }
        result
    }

    /// Rolls back a transaction that never reached commit, bounded by the deadline.
    ///
    /// A transaction interrupted inside commit is already consumed; dropping
    /// it discards the uncommitted work.
    async fn abandon(&self, tx: Option<Box<dyn GraphTransaction>>, query: &NamedQuery) {
        let Some(tx) = tx else { return };
        match tokio::time::timeout(self.deadline, tx.rollback()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(query = query.name(), error = %e, "Rollback failed"),
            Err(_) => tracing::warn!(query = query.name(), "Rollback timed out"),
        }
    }
}

async fn finish(tx: Box<dyn GraphTransaction>, mode: AccessMode) -> std::result::Result<(), StorageError> {
    match mode {
        AccessMode::Read => tx.rollback().await,
        AccessMode::Write => tx.commit().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestContext, SessionProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use thrones_core::{InternalId, NewCharacter};
    use thrones_storage::{GraphBackend, MemoryBackend, MemoryGraph};

    fn executor(deadline: Duration) -> QueryExecutor {
        QueryExecutor::new(deadline, Arc::new(Metrics::new().unwrap()))
    }

    fn hodor() -> NamedQuery {
        NamedQuery::CreateCharacter(NewCharacter {
            name: "Hodor".into(),
            is_female: false,
            played_by: "Kristian Nairn".into(),
            culture: "Northmen".into(),
        })
    }

    #[tokio::test]
    async fn test_write_commits() {
        let backend = MemoryBackend::new(MemoryGraph::new());
        let mut session = backend.open_session().await.unwrap();
        let exec = executor(Duration::from_secs(1));

        let rows = exec.run_write(session.as_mut(), &hodor()).await.unwrap();
        assert_eq!(rows[0].internal_id("internal_id").unwrap(), InternalId(0));
        assert_eq!(backend.graph().read().await.node_count(), 1);
        assert_eq!(exec.metrics.query_count("create_character", QueryOutcome::Ok), 1);
    }

    #[tokio::test]
    async fn test_read_transaction_never_persists() {
        let backend = MemoryBackend::new(MemoryGraph::new());
        let mut session = backend.open_session().await.unwrap();
        let exec = executor(Duration::from_secs(1));

        let err = exec.run_read(session.as_mut(), &hodor()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Storage(StorageError::AccessDenied { .. })));
        assert_eq!(backend.graph().read().await.node_count(), 0);
        assert_eq!(exec.metrics.query_count("create_character", QueryOutcome::Error), 1);
    }

    /// Where a [`Stalled`] transaction hangs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Stall {
        Run,
        Commit,
    }

    /// Backend whose transactions never finish at one stage.
    struct Stalled {
        stall: Stall,
        rolled_back: Arc<AtomicBool>,
    }

    struct StalledTx {
        stall: Stall,
        rolled_back: Arc<AtomicBool>,
    }

    impl Stalled {
        fn new(stall: Stall) -> Self {
            Self {
                stall,
                rolled_back: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    async fn hang() {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }

    #[async_trait]
    impl GraphBackend for Stalled {
        fn kind(&self) -> &'static str {
            "stalled"
        }

        async fn open_session(&self) -> std::result::Result<Box<dyn GraphSession>, StorageError> {
            Ok(Box::new(Stalled {
                stall: self.stall,
                rolled_back: self.rolled_back.clone(),
            }))
        }
    }

    #[async_trait]
    impl GraphSession for Stalled {
        async fn begin(&mut self, _mode: AccessMode) -> std::result::Result<Box<dyn GraphTransaction>, StorageError> {
            Ok(Box::new(StalledTx {
                stall: self.stall,
                rolled_back: self.rolled_back.clone(),
            }))
        }

        async fn close(self: Box<Self>) -> std::result::Result<(), StorageError> {
            Ok(())
        }
    }

    #[async_trait]
    impl GraphTransaction for StalledTx {
        async fn run(&mut self, _query: &NamedQuery) -> std::result::Result<Vec<Record>, StorageError> {
            if self.stall == Stall::Run {
                hang().await;
            }
            Ok(Vec::new())
        }

        async fn commit(self: Box<Self>) -> std::result::Result<(), StorageError> {
            if self.stall == Stall::Commit {
                hang().await;
            }
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> std::result::Result<(), StorageError> {
            self.rolled_back.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deadline_rolls_back() {
        let backend = Stalled::new(Stall::Run);
        let mut session = backend.open_session().await.unwrap();
        let exec = executor(Duration::from_millis(50));

        let err = exec.run_read(session.as_mut(), &NamedQuery::Regions).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Timeout { query: "regions", .. }));
        assert!(backend.rolled_back.load(Ordering::SeqCst));
        assert_eq!(exec.metrics.query_count("regions", QueryOutcome::Timeout), 1);
    }

    #[tokio::test]
    async fn test_deadline_covers_commit() {
        let backend = Stalled::new(Stall::Commit);
        let mut session = backend.open_session().await.unwrap();
        let exec = executor(Duration::from_millis(50));

        let started = Instant::now();
        let err = exec.run_write(session.as_mut(), &hodor()).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(err, ExecutionError::Timeout { query: "create_character", .. }));
        assert_eq!(exec.metrics.query_count("create_character", QueryOutcome::Timeout), 1);
        assert_eq!(exec.metrics.query_count("create_character", QueryOutcome::Ok), 0);
    }

    #[tokio::test]
    async fn test_session_released_after_timeout() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let backend: Arc<dyn GraphBackend> = Arc::new(Stalled::new(Stall::Run));
        let provider = Arc::new(SessionProvider::new(backend, metrics.clone()));
        let exec = Arc::new(QueryExecutor::new(Duration::from_millis(50), metrics.clone()));
        let mut ctx = RequestContext::new(provider, exec);

        let err = ctx.run_read(&NamedQuery::Regions).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Timeout { .. }));
        assert!(ctx.has_session());
        assert_eq!(metrics.open_sessions(), 1);

        ctx.release().await;
        assert!(!ctx.has_session());
        assert_eq!(metrics.open_sessions(), 0);
    }
}
