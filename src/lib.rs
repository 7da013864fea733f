//! Single-session chat backend
//!
//! Keeps an ordered transcript of user and assistant turns, formats it for
//! Gemini, and sequences one request/response round trip at a time.

pub mod api;
pub mod config;
pub mod llm;
pub mod runtime;
pub mod session;
pub mod state_machine;
pub mod transcript;

pub use runtime::{AssistantReply, TurnError, TurnOrchestrator};
pub use session::{Session, SessionHandle};
pub use transcript::{Speaker, Transcript, Turn, ValidationError};
