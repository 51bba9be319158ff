use async_trait::async_trait;
use research_agent_core::Agent;
use thiserror::Error;

use crate::conversation::Turn;

/// Errors returned by a [`ChatBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The agent run failed.
    #[error(transparent)]
    Agent(#[from] research_agent_core::Error),
    /// Any other failure, reported with its message.
    #[error("{0}")]
    Other(String),
}

/// Something that answers chat messages.
#[async_trait]
pub trait ChatBackend: Send {
    /// Answers `message`.
    ///
    /// `history` holds the turns recorded before `message`. Backends that
    /// keep their own history may ignore it.
    async fn send(
        &mut self,
        history: &[Turn],
        message: &str,
    ) -> Result<String, BackendError>;
}

#[async_trait]
impl ChatBackend for Agent {
    async fn send(
        &mut self,
        _history: &[Turn],
        message: &str,
    ) -> Result<String, BackendError> {
        let resp = self.run(message).await?;
        if !resp.tool_calls.is_empty() {
            let names: Vec<_> =
                resp.tool_calls.iter().map(|call| call.name.as_str()).collect();
            debug!("answered with tools: {}", names.join(", "));
        }
        Ok(resp.content)
    }
}
