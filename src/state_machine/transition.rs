//! Pure state transition function

use super::{Effect, Event, TurnState};
use crate::llm::LlmErrorKind;
use crate::transcript::{validate_text, ValidationError};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A reply is still pending, wait for it or cancel first")]
    Busy,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Pure transition function: no I/O, same inputs give the same outputs.
///
/// # Errors
///
/// Rejects empty user messages and messages sent while a reply is pending.
/// A rejected event leaves the state as it was.
pub fn transition(state: &TurnState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User messages
        // ============================================================
        (TurnState::Idle, Event::UserMessage { request_id, text }) => {
            validate_text(&text)?;
            Ok(TransitionResult::new(TurnState::AwaitingReply {
                request_id,
                user_text: text,
            })
            .with_effect(Effect::RequestGeneration { request_id }))
        }

        // Never interleave turns
        (TurnState::AwaitingReply { .. }, Event::UserMessage { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Results for the in-flight request
        // ============================================================
        (
            TurnState::AwaitingReply {
                request_id,
                user_text,
            },
            Event::ReplyReceived {
                request_id: reply_id,
                text,
                partial,
            },
        ) if *request_id == reply_id => {
            // A blank reply cannot become a turn; any other text is kept verbatim
            let effect = if text.trim().is_empty() {
                Effect::report_failure(reply_id, LlmErrorKind::Unknown, "Model returned an empty reply")
            } else {
                Effect::CommitTurns {
                    request_id: reply_id,
                    user_text: user_text.clone(),
                    assistant_text: text,
                    partial,
                }
            };
            Ok(TransitionResult::new(TurnState::Idle).with_effect(effect))
        }

        (
            TurnState::AwaitingReply { request_id, .. },
            Event::GenerationFailed {
                request_id: failed_id,
                kind,
                message,
            },
        ) if *request_id == failed_id => Ok(TransitionResult::new(TurnState::Idle)
            .with_effect(Effect::report_failure(failed_id, kind, message))),

        (TurnState::AwaitingReply { request_id, .. }, Event::Abandon { request_id: abandoned })
            if *request_id == abandoned =>
        {
            Ok(TransitionResult::new(TurnState::Idle))
        }

        // ============================================================
        // Cancellation
        // ============================================================
        (TurnState::AwaitingReply { request_id, .. }, Event::Cancel) => {
            Ok(TransitionResult::new(TurnState::Idle).with_effect(Effect::AbortGeneration {
                request_id: *request_id,
            }))
        }

        (TurnState::Idle, Event::Cancel) => Ok(TransitionResult::new(TurnState::Idle)),

        // ============================================================
        // Stale results: wrong id, or nothing in flight
        // ============================================================
        (
            state,
            Event::ReplyReceived { request_id, .. }
            | Event::GenerationFailed { request_id, .. }
            | Event::Abandon { request_id },
        ) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::DiscardStale { request_id })),
    }
}
