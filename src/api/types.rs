//! API request and response types

use crate::runtime::AssistantReply;
use crate::transcript::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Reply plus the transcript after the commit
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    #[serde(flatten)]
    pub reply: AssistantReply,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: &'static str,
    pub model: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub ok: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
