//! Ordered, append-only conversation history

use crate::llm::{LlmMessage, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message text must not be empty")]
    EmptyText,
}

/// Reject text with no visible content.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyText`] for empty or whitespace-only text.
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Provider role for this speaker
    pub fn role(self) -> MessageRole {
        match self {
            Speaker::User => MessageRole::User,
            Speaker::Assistant => MessageRole::Model,
        }
    }
}

/// One utterance in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn to_llm_message(&self) -> LlmMessage {
        LlmMessage {
            role: self.speaker.role(),
            content: self.text.clone(),
        }
    }
}

/// Session history. Turns can only be added, never edited or removed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end.
    ///
    /// # Errors
    ///
    /// Rejects turns with empty text; the transcript is left unchanged.
    pub fn append(&mut self, turn: Turn) -> Result<(), ValidationError> {
        validate_text(&turn.text)?;
        self.turns.push(turn);
        Ok(())
    }

    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Map every turn 1:1, in order, to the provider's `{role, content}` shape.
pub fn format_history(turns: &[Turn]) -> Vec<LlmMessage> {
    turns.iter().map(Turn::to_llm_message).collect()
}
