use std::fmt::{self, Debug, Display, Formatter};

/// The services that need a secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    /// The language model provider. Its key is required.
    OpenAI,
    /// The web search provider. Its key is optional.
    Serper,
}

impl Provider {
    /// Returns `true` if the agent cannot be built without this key.
    #[inline]
    pub fn is_required(self) -> bool {
        matches!(self, Provider::OpenAI)
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "OpenAI"),
            Provider::Serper => write!(f, "Serper"),
        }
    }
}

/// The secrets entered during a session.
///
/// Values live in memory only. Setting a value overwrites the previous one
/// and an empty string clears it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialStore {
    openai: String,
    serper: String,
}

impl CredentialStore {
    /// Stores the secret for `provider`.
    pub fn set<S: Into<String>>(&mut self, provider: Provider, value: S) {
        *self.slot_mut(provider) = value.into();
    }

    /// Returns the secret for `provider`, or `""` if it is not set.
    #[inline]
    pub fn get(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAI => &self.openai,
            Provider::Serper => &self.serper,
        }
    }

    /// Returns `true` if a non-empty secret is stored for `provider`.
    #[inline]
    pub fn is_present(&self, provider: Provider) -> bool {
        !self.get(provider).is_empty()
    }

    fn slot_mut(&mut self, provider: Provider) -> &mut String {
        match provider {
            Provider::OpenAI => &mut self.openai,
            Provider::Serper => &mut self.serper,
        }
    }
}

impl Debug for CredentialStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("openai", &self.is_present(Provider::OpenAI))
            .field("serper", &self.is_present(Provider::Serper))
            .finish()
    }
}
