//! Effects produced by turn transitions

use super::state::RequestId;
use crate::llm::LlmErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Call the generation service
    RequestGeneration { request_id: RequestId },

    /// Append the user turn, then the assistant turn
    CommitTurns {
        request_id: RequestId,
        user_text: String,
        assistant_text: String,
        partial: bool,
    },

    /// Surface a failed turn; nothing is appended
    ReportFailure {
        request_id: RequestId,
        kind: LlmErrorKind,
        message: String,
    },

    /// Stop waiting on the in-flight request
    AbortGeneration { request_id: RequestId },

    /// A result arrived for a request that is no longer in flight
    DiscardStale { request_id: RequestId },
}

impl Effect {
    pub fn report_failure(request_id: RequestId, kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Effect::ReportFailure {
            request_id,
            kind,
            message: message.into(),
        }
    }
}
