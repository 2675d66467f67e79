//! # Thrones CLI
//!
//! HTTP facade over the Westeros graph.

pub mod error;
pub mod handlers;
pub mod server;
pub mod session_middleware;

pub use error::ApiError;
pub use server::{create_router, run_server, AppState};
