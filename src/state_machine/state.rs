//! Turn state types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one generation request. Results tagged with an id that is no
/// longer in flight are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-session turn state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// A generation request is in flight. The user text is held here and
    /// only reaches the transcript once the reply is committed.
    AwaitingReply {
        request_id: RequestId,
        user_text: String,
    },
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        match self {
            TurnState::Idle => None,
            TurnState::AwaitingReply { request_id, .. } => Some(*request_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingReply { .. } => "awaiting_reply",
        }
    }
}
