//! The agent runtime: request loop, tool execution, history and memory.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod error;
pub mod memory;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, RunResponse};
pub use error::Error;
