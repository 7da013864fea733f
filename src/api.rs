//! HTTP API
//!
//! A thin JSON surface over one shared session, for the chat page.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::TurnOrchestrator;
use crate::session::SessionHandle;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub orchestrator: Arc<TurnOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: TurnOrchestrator) -> Self {
        Self {
            session: SessionHandle::new(),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
