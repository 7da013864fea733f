//! Conversation session
//!
//! One session owns one transcript and one turn state. Callers hold a
//! [`SessionHandle`] and decide when to create and drop it.

use crate::runtime::TurnError;
use crate::state_machine::{transition, Effect, Event, RequestId, TurnState};
use crate::transcript::{validate_text, Transcript, Turn};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    transcript: Transcript,
    state: TurnState,
    /// Token for the request currently in flight
    in_flight: Option<(RequestId, CancellationToken)>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            transcript: Transcript::new(),
            state: TurnState::Idle,
            in_flight: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Run one transition and execute the effects that only touch the
    /// session. All effects are returned for the caller to act on.
    ///
    /// # Errors
    ///
    /// Returns the transition error (busy, validation) without changing
    /// anything.
    pub fn apply(&mut self, event: Event) -> Result<Vec<Effect>, TurnError> {
        let event_id = event.request_id();
        let result = transition(&self.state, event)?;

        // Validate the commit before touching state so a rejected append
        // can't leave the session half-updated.
        let staged: Vec<Turn> = result
            .effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::CommitTurns {
                    user_text,
                    assistant_text,
                    ..
                } => Some([
                    Turn::user(user_text.clone()),
                    Turn::assistant(assistant_text.clone()),
                ]),
                _ => None,
            })
            .flatten()
            .collect();
        for turn in &staged {
            validate_text(&turn.text)?;
        }

        if self.state != result.new_state {
            tracing::debug!(
                session_id = %self.id,
                request_id = ?event_id,
                from = self.state.name(),
                to = result.new_state.name(),
                "Turn state changed"
            );
        }
        self.state = result.new_state;
        for turn in staged {
            self.transcript.append(turn)?;
        }

        for effect in &result.effects {
            match effect {
                Effect::AbortGeneration { request_id } => self.abort(*request_id),
                Effect::DiscardStale { request_id } => {
                    tracing::debug!(session_id = %self.id, request_id = %request_id, "Discarding stale result");
                }
                _ => {}
            }
        }
        if self.state.is_idle() {
            self.in_flight = None;
        }

        Ok(result.effects)
    }

    /// Associate a cancellation token with the request now in flight.
    pub fn track(&mut self, request_id: RequestId, token: CancellationToken) {
        if self.state.in_flight() == Some(request_id) {
            self.in_flight = Some((request_id, token));
        }
    }

    fn abort(&mut self, request_id: RequestId) {
        if let Some((id, token)) = self.in_flight.take() {
            if id == request_id {
                token.cancel();
            } else {
                self.in_flight = Some((id, token));
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some((_, token)) = self.in_flight.take() {
            token.cancel();
        }
    }
}

/// Shared handle to a session.
///
/// The lock is only ever held for a single transition, never across an
/// await.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.lock().id()
    }

    /// Owned copy of the transcript in conversation order
    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().transcript().snapshot().to_vec()
    }

    pub fn state(&self) -> TurnState {
        self.lock().state().clone()
    }

    pub fn is_busy(&self) -> bool {
        !self.lock().state().is_idle()
    }

    /// Apply an event under the lock. See [`Session::apply`].
    ///
    /// # Errors
    ///
    /// Propagates transition errors.
    pub fn apply(&self, event: Event) -> Result<Vec<Effect>, TurnError> {
        self.lock().apply(event)
    }

    /// Abandon the in-flight request, if any. Its result will be discarded.
    pub fn cancel(&self) {
        // Cancel is accepted in every state
        if let Err(e) = self.apply(Event::Cancel) {
            tracing::warn!(error = %e, "Cancel rejected");
        }
    }

    /// Dispose of the current session and start a fresh one in place.
    pub fn reset(&self) -> Uuid {
        let mut session = self.lock();
        let old_id = session.id();
        // Dropping the old session cancels anything in flight
        *session = Session::new();
        tracing::info!(old_session_id = %old_id, session_id = %session.id(), "Session reset");
        session.id()
    }
}
