//! Request-scoped graph sessions.
//!
//! A [`RequestContext`] is created when a request arrives. Its session is
//! acquired on the first query, reused by every later query of the same
//! request, and released when the request completes. Sessions are never
//! shared across requests.

use crate::executor::QueryExecutor;
use crate::Result;
use std::sync::Arc;
use thrones_core::{NamedQuery, Record};
use thrones_storage::{GraphBackend, GraphSession, Metrics, StorageError};
use tokio::sync::{Mutex, MutexGuard};

/// Hands out sessions on the configured backend.
pub struct SessionProvider {
    backend: Arc<dyn GraphBackend>,
    metrics: Arc<Metrics>,
}

impl SessionProvider {
    pub fn new(backend: Arc<dyn GraphBackend>, metrics: Arc<Metrics>) -> Self {
        Self { backend, metrics }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub async fn acquire(&self) -> std::result::Result<Box<dyn GraphSession>, StorageError> {
        let session = self.backend.open_session().await?;
        self.metrics.session_opened();
        tracing::trace!(backend = self.backend.kind(), "Session acquired");
        Ok(session)
    }

    pub async fn release(&self, session: Box<dyn GraphSession>) {
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Failed to close session");
        }
        self.metrics.session_closed();
        tracing::trace!(backend = self.backend.kind(), "Session released");
    }
}

/// Everything one request needs to talk to the graph.
pub struct RequestContext {
    provider: Arc<SessionProvider>,
    executor: Arc<QueryExecutor>,
    session: Option<Box<dyn GraphSession>>,
}

impl RequestContext {
    pub fn new(provider: Arc<SessionProvider>, executor: Arc<QueryExecutor>) -> Self {
        Self {
            provider,
            executor,
            session: None,
        }
    }

    /// Whether a session is currently held.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    async fn session(&mut self) -> Result<&mut dyn GraphSession> {
        match &mut self.session {
            Some(session) => Ok(session.as_mut()),
            slot => {
                let session = self.provider.acquire().await?;
                Ok(slot.insert(session).as_mut())
            }
        }
    }

    pub async fn run_read(&mut self, query: &NamedQuery) -> Result<Vec<Record>> {
        let executor = self.executor.clone();
        executor.run_read(self.session().await?, query).await
    }

    pub async fn run_write(&mut self, query: &NamedQuery) -> Result<Vec<Record>> {
        let executor = self.executor.clone();
        executor.run_write(self.session().await?, query).await
    }

    /// Closes the session, if one was acquired.
    pub async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.provider.release(session).await;
        }
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            // Dropping the session closes it; only the bookkeeping is left.
            self.provider.metrics.session_closed();
            tracing::warn!("Request ended without releasing its session");
        }
    }
}

/// Cloneable handle to a [`RequestContext`], stored in request extensions.
#[derive(Clone)]
pub struct RequestScope(Arc<Mutex<RequestContext>>);

impl RequestScope {
    pub fn new(context: RequestContext) -> Self {
        Self(Arc::new(Mutex::new(context)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, RequestContext> {
        self.0.lock().await
    }

    pub async fn release(&self) {
        self.0.lock().await.release().await;
    }
}
