//! Events that drive turn transitions

use super::state::RequestId;
use crate::llm::LlmErrorKind;

#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        request_id: RequestId,
        text: String,
    },
    /// The presentation context went away; abandon whatever is in flight.
    Cancel,

    // Generation events
    ReplyReceived {
        request_id: RequestId,
        text: String,
        partial: bool,
    },
    GenerationFailed {
        request_id: RequestId,
        kind: LlmErrorKind,
        message: String,
    },
    /// The future awaiting the reply was dropped before it finished.
    Abandon { request_id: RequestId },
}

impl Event {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Event::UserMessage { request_id, .. }
            | Event::ReplyReceived { request_id, .. }
            | Event::GenerationFailed { request_id, .. }
            | Event::Abandon { request_id } => Some(*request_id),
            Event::Cancel => None,
        }
    }
}
