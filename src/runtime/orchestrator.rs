//! Turn orchestrator

use super::{AssistantReply, TurnError};
use crate::llm::{GenerationConfig, LlmError, LlmRequest, LlmService, Usage};
use crate::session::SessionHandle;
use crate::state_machine::{Effect, Event, RequestId};
use crate::transcript::{format_history, validate_text};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs single turns against a generation service.
///
/// Holds no session state of its own; the session is passed in per call
/// and only borrowed for the duration of that turn.
pub struct TurnOrchestrator {
    llm: Arc<dyn LlmService>,
    generation: GenerationConfig,
    request_timeout: Duration,
}

impl TurnOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmService>,
        generation: GenerationConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            generation,
            request_timeout,
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Send `text` as the next user turn and wait for the reply.
    ///
    /// Both turns are appended only after the reply arrives, user first.
    /// On any error the transcript is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`TurnError::Validation`] for empty text (nothing is sent)
    /// - [`TurnError::Busy`] if the session already has a turn in flight
    /// - [`TurnError::Generation`] if the service failed or timed out
    /// - [`TurnError::Abandoned`] if the session was cancelled or reset
    ///   while waiting
    pub async fn handle_user_message(
        &self,
        session: &SessionHandle,
        text: &str,
    ) -> Result<AssistantReply, TurnError> {
        validate_text(text)?;

        let request_id = RequestId::new();
        let cancel = CancellationToken::new();

        let (session_id, request) = {
            let mut guard = session.lock();
            let history = format_history(guard.transcript().snapshot());
            guard.apply(Event::UserMessage {
                request_id,
                text: text.to_string(),
            })?;
            guard.track(request_id, cancel.clone());
            (
                guard.id(),
                LlmRequest {
                    history,
                    message: text.to_string(),
                    config: self.generation.clone(),
                },
            )
        };

        tracing::info!(
            session_id = %session_id,
            request_id = %request_id,
            model = %self.llm.model_id(),
            history_len = request.history.len(),
            "Requesting reply"
        );

        let mut pending = PendingTurn::new(session, request_id);
        let outcome = tokio::select! {
            result = tokio::time::timeout(self.request_timeout, self.llm.complete(&request)) => {
                result.unwrap_or_else(|_| {
                    Err(LlmError::network(format!(
                        "No reply within {}s",
                        self.request_timeout.as_secs_f32()
                    )))
                })
            }
            () = cancel.cancelled() => {
                pending.disarm();
                tracing::info!(session_id = %session_id, request_id = %request_id, "Turn cancelled while awaiting reply");
                return Err(TurnError::Abandoned);
            }
        };
        pending.disarm();

        let (event, usage, failure) = match outcome {
            Ok(response) => (
                Event::ReplyReceived {
                    request_id,
                    text: response.text,
                    partial: !response.end_turn,
                },
                response.usage,
                None,
            ),
            Err(err) => {
                if let Some(partial) = err.recoverable_text() {
                    tracing::warn!(
                        session_id = %session_id,
                        request_id = %request_id,
                        reason = %err.message,
                        "Generation stopped early, keeping partial reply"
                    );
                    let event = Event::ReplyReceived {
                        request_id,
                        text: partial.to_string(),
                        partial: true,
                    };
                    (event, Usage::default(), None)
                } else {
                    let event = Event::GenerationFailed {
                        request_id,
                        kind: err.kind,
                        message: err.message.clone(),
                    };
                    (event, Usage::default(), Some(err))
                }
            }
        };

        for effect in session.apply(event)? {
            match effect {
                Effect::CommitTurns {
                    assistant_text,
                    partial,
                    ..
                } => {
                    tracing::info!(
                        session_id = %session_id,
                        request_id = %request_id,
                        partial,
                        "Turn committed"
                    );
                    return Ok(AssistantReply {
                        request_id,
                        text: assistant_text,
                        partial,
                        usage,
                    });
                }
                Effect::ReportFailure { kind, message, .. } => {
                    let err = failure.unwrap_or_else(|| LlmError::new(kind, message));
                    tracing::warn!(
                        session_id = %session_id,
                        request_id = %request_id,
                        kind = err.kind.as_str(),
                        error = %err.message,
                        "Turn rejected"
                    );
                    return Err(TurnError::Generation(err));
                }
                Effect::DiscardStale { .. } => return Err(TurnError::Abandoned),
                Effect::RequestGeneration { .. } | Effect::AbortGeneration { .. } => {}
            }
        }

        Err(TurnError::Abandoned)
    }
}

/// Returns the session to idle if the turn's future is dropped mid-await.
struct PendingTurn<'a> {
    session: &'a SessionHandle,
    request_id: RequestId,
    armed: bool,
}

impl<'a> PendingTurn<'a> {
    fn new(session: &'a SessionHandle, request_id: RequestId) -> Self {
        Self {
            session,
            request_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(request_id = %self.request_id, "Turn dropped before reply");
            if let Err(e) = self.session.apply(Event::Abandon {
                request_id: self.request_id,
            }) {
                tracing::warn!(request_id = %self.request_id, error = %e, "Abandon rejected");
            }
        }
    }
}
