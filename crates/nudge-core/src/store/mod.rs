//! Ready-made collaborator implementations.

mod file_config;
mod memory;

pub use file_config::FileConfigStore;
pub use memory::InMemoryConversationStore;
