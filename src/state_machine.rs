//! Turn-taking state machine
//!
//! Pure transitions in the Elm style: `(state, event) -> (state, effects)`.
//! Executing the effects is left to the session and the orchestrator.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{RequestId, TurnState};
pub use transition::{transition, TransitionError, TransitionResult};
