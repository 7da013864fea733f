//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// Text the provider produced before it stopped (only for `StoppedEarly`)
    pub partial: Option<String>,
    /// Server-suggested wait before retrying (rate limits)
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            partial: None,
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    #[must_use]
    pub fn with_partial(mut self, text: impl Into<String>) -> Self {
        self.partial = Some(text.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    /// Generation was interrupted by the provider; `text` is whatever it
    /// produced before stopping and may be empty.
    pub fn stopped_early(reason: &str, text: impl Into<String>) -> Self {
        Self::new(
            LlmErrorKind::StoppedEarly,
            format!("Generation stopped early: {reason}"),
        )
        .with_partial(text)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Partial text usable as a reply, if the provider left any.
    pub fn recoverable_text(&self) -> Option<&str> {
        if self.kind != LlmErrorKind::StoppedEarly {
            return None;
        }
        self.partial
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Network issues, timeouts - retryable
    Network,
    /// Rate limited or quota exhausted (429) - retryable with backoff
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Bad request (400) or blocked prompt - not retryable
    InvalidRequest,
    /// Provider stopped mid-response; may carry partial text
    StoppedEarly,
    /// Unknown error
    Unknown,
}

impl LlmErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Auth => "auth",
            Self::InvalidRequest => "invalid_request",
            Self::StoppedEarly => "stopped_early",
            Self::Unknown => "unknown",
        }
    }
}
