//! Turn orchestration
//!
//! Drives one user message through the generation service and reconciles
//! the outcome back into the session.

mod orchestrator;

#[cfg(test)]
pub mod testing;

pub use orchestrator::TurnOrchestrator;

use crate::llm::{LlmError, Usage};
use crate::state_machine::{RequestId, TransitionError};
use crate::transcript::ValidationError;
use serde::Serialize;
use thiserror::Error;

/// Assistant side of a committed turn
#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub request_id: RequestId,
    pub text: String,
    /// The provider stopped before finishing; `text` is what it produced
    pub partial: bool,
    pub usage: Usage,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("A reply is still pending, wait for it or cancel first")]
    Busy,
    #[error("Could not get a response: {0}")]
    Generation(#[from] LlmError),
    #[error("The request was cancelled before a reply arrived")]
    Abandoned,
}

impl From<TransitionError> for TurnError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Busy => TurnError::Busy,
            TransitionError::Validation(e) => TurnError::Validation(e),
        }
    }
}
