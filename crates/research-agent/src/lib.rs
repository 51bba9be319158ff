//! A conversational research assistant.
//!
//! The crate wires an OpenAI model, a session summarizer and research
//! tools (web search, Wikipedia, reasoning) into an agent, and wraps it in
//! a [`ChatSession`] that owns the credentials and the visible chat
//! history. The bundled `research-agent` binary is a terminal front-end
//! for it.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod backend;
mod conversation;
mod credentials;
mod factory;
mod session;
mod settings;
pub mod tools;

pub use backend::{BackendError, ChatBackend};
pub use conversation::{ConversationStore, Role, Turn};
pub use credentials::{CredentialStore, Provider};
pub use factory::{AgentFactory, ConstructionError, ResearchAgentFactory};
pub use session::{ChatError, ChatSession, ChatState};
pub use settings::Settings;

/// Re-exports of [`research_agent_core`] crate.
pub mod core {
    pub use research_agent_core::*;
}
