use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use research_agent_model::{ErrorKind, ModelFinishReason, ModelProviderError};

/// The error returned when an agent run fails.
#[derive(Debug)]
pub enum Error {
    /// The model provider failed.
    Model(Box<dyn ModelProviderError>),
    /// The model kept requesting tools beyond the iteration limit.
    TooManyIterations(usize),
    /// The model finished without producing any text.
    EmptyResponse(Option<ModelFinishReason>),
}

impl Error {
    /// Returns the provider error kind, if the model provider failed.
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Model(err) => Some(err.kind()),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Model(err) => write!(f, "model error ({}): {err}", err.kind()),
            Error::TooManyIterations(limit) => {
                write!(f, "gave up after {limit} model calls")
            }
            Error::EmptyResponse(Some(ModelFinishReason::ContentFilter)) => {
                write!(f, "the response was withheld by the content filter")
            }
            Error::EmptyResponse(_) => write!(f, "the model returned no text"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Model(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
