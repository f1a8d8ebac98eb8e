//! Core types for nudge.

mod message;
mod mode;
mod state;

pub use message::*;
pub use mode::*;
pub use state::*;
