//! Provider-neutral types for talking to chat models.
//!
//! The agent runtime only speaks the types defined here. Each model
//! backend (OpenAI-compatible endpoints, the scripted test model, ...)
//! implements [`ModelProvider`] and translates these types into its own
//! wire format.
//!
//! Nothing in this crate performs I/O.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
