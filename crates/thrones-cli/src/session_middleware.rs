//! Per-request graph session scope.
//!
//! Installs a [`RequestScope`] into the request extensions before the handler
//! runs and releases its session once the response is produced, whatever the
//! handler returned.

use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use thrones_executor::{RequestContext, RequestScope};

pub async fn session_scope(State(state): State<Arc<AppState>>, mut request: Request<Body>, next: Next) -> Response {
    let scope = RequestScope::new(RequestContext::new(state.provider.clone(), state.executor.clone()));
    request.extensions_mut().insert(scope.clone());

    let response = next.run(request).await;

    scope.release().await;
    state.metrics.record_http_status(response.status().as_u16());
    response
}
