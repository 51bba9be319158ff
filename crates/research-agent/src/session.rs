use thiserror::Error;

use crate::backend::{BackendError, ChatBackend};
use crate::conversation::{ConversationStore, Turn};
use crate::credentials::{CredentialStore, Provider};
use crate::factory::{AgentFactory, ConstructionError};

/// Where a [`ChatSession`] stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatState {
    /// No agent exists yet. The next message (or [`ChatSession::prepare`])
    /// builds one if the OpenAI key is set.
    AwaitingCredentials,
    /// An agent is ready for the next message.
    Idle,
    /// A message is being answered.
    AwaitingResponse,
}

/// The errors a chat interaction can end with.
///
/// None of them ends the session. The history recorded before the error
/// is kept.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The OpenAI key has not been entered.
    #[error("Please enter your OpenAI API key")]
    MissingCredential,
    /// The agent could not be built.
    #[error("Failed to initialize agent: {0}")]
    Construction(#[source] ConstructionError),
    /// The agent failed to answer.
    #[error("An error occurred: {0}")]
    Invocation(#[source] BackendError),
}

/// A chat session: credentials, the visible history, and a lazily built
/// agent.
pub struct ChatSession<F> {
    factory: F,
    credentials: CredentialStore,
    history: ConversationStore,
    backend: Option<Box<dyn ChatBackend>>,
    state: ChatState,
}

impl<F: AgentFactory> ChatSession<F> {
    /// Creates a session with no credentials and no history.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            credentials: CredentialStore::default(),
            history: ConversationStore::default(),
            backend: None,
            state: ChatState::AwaitingCredentials,
        }
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> ChatState {
        self.state
    }

    /// Returns the turns of this session, oldest first.
    #[inline]
    pub fn history(&self) -> &[Turn] {
        self.history.all()
    }

    /// Returns the credentials entered so far.
    #[inline]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Returns the agent factory.
    #[inline]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Stores a credential.
    ///
    /// Changing a value drops the current agent, the next message builds
    /// a new one with the new credentials. The history is kept.
    pub fn set_credential<S: Into<String>>(
        &mut self,
        provider: Provider,
        value: S,
    ) {
        let value = value.into();
        if self.credentials.get(provider) == value {
            return;
        }
        self.credentials.set(provider, value);
        if self.backend.take().is_some() {
            info!("{provider} API key changed, the agent will be rebuilt");
        }
        self.state = ChatState::AwaitingCredentials;
    }

    /// Builds the agent if there is none yet.
    pub fn prepare(&mut self) -> Result<(), ChatError> {
        self.ensure_backend()
    }

    /// Sends a message and returns the answer.
    ///
    /// The user turn is recorded once the agent is ready. It stays in the
    /// history even if answering fails, the assistant turn is recorded
    /// only on success.
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<String, ChatError> {
        self.ensure_backend()?;
        let Some(backend) = self.backend.as_mut() else {
            return Err(ChatError::MissingCredential);
        };

        let previous_turns = self.history.len();
        self.history.append(Turn::user(message));
        self.state = ChatState::AwaitingResponse;

        let result = backend
            .send(&self.history.all()[..previous_turns], message)
            .await;
        self.state = ChatState::Idle;

        match result {
            Ok(reply) => {
                self.history.append(Turn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(err) => {
                warn!("failed to answer: {err}");
                Err(ChatError::Invocation(err))
            }
        }
    }

    /// Starts a new chat: drops the agent and the history.
    pub fn new_chat(&mut self) {
        self.reset();
    }

    /// Drops the agent and the history, returning how many turns were
    /// removed.
    pub fn clear_history(&mut self) -> usize {
        self.reset()
    }

    fn reset(&mut self) -> usize {
        self.backend = None;
        self.state = ChatState::AwaitingCredentials;
        self.history.clear()
    }

    fn ensure_backend(&mut self) -> Result<(), ChatError> {
        if !self.credentials.is_present(Provider::OpenAI) {
            return Err(ChatError::MissingCredential);
        }
        if self.backend.is_none() {
            let backend = self
                .factory
                .build(&self.credentials)
                .map_err(ChatError::Construction)?;
            info!("agent initialized");
            self.state = ChatState::Idle;
            self.backend = Some(backend);
        }
        Ok(())
    }
}
