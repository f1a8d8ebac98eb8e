//! Host adapter seams.
//!
//! The scheduler core never talks to a chat host, a model provider or a
//! settings store directly; it goes through these traits.

mod config_store;
mod conversation;
mod generator;

pub use config_store::*;
pub use conversation::*;
pub use generator::*;
