//! Conversation state machine
//!
//! Pure transitions over a [`Session`]: the transition function never does
//! I/O, it returns the next session plus effects for the runtime to run.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Reply, ResponseKind};
pub use event::Event;
pub use state::{ConvState, HistoryKind, MenuType, Session};
pub use transition::{transition, TransitionError};
