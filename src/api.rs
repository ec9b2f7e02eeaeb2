//! HTTP API for sqlpilot

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
pub use sse::StreamEvent;
pub use types::*;

use crate::agent::Agent;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` when no model backend is configured; chat requests then fail
    /// with a service-unavailable error instead of crashing at startup.
    pub agent: Option<Arc<Agent>>,
}

impl AppState {
    pub fn new(agent: Option<Arc<Agent>>) -> Self {
        Self { agent }
    }
}
