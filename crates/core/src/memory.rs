//! Session memory: a running summary of the conversation.

use research_agent_model::{ModelMessage, ModelProvider, ModelRequest};

use crate::Error;
use crate::conversation::Conversation;
use crate::model_client::ModelClient;

const SUMMARIZER_PROMPT: &str = "\
You maintain a summary of a conversation between a user and an assistant. \
Given the previous summary (if any) and the conversation so far, write an \
updated summary that keeps every fact later turns may rely on. Reply with \
the summary only.";

/// A summary of the session so far.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// The summary text.
    pub text: String,
    /// How many runs the summary covers.
    pub runs_covered: usize,
}

/// Produces [`SessionSummary`]s with its own model.
#[derive(Clone)]
pub struct SessionSummarizer {
    model_client: ModelClient,
    additional_instructions: Option<String>,
}

impl SessionSummarizer {
    /// Creates a summarizer using the given model provider.
    pub fn with_model_provider<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            additional_instructions: None,
        }
    }

    /// Appends instructions on what the summary should contain.
    pub fn with_additional_instructions<S: Into<String>>(
        mut self,
        instructions: S,
    ) -> Self {
        self.additional_instructions = Some(instructions.into());
        self
    }

    /// Returns the id of the summarizing model.
    #[inline]
    pub fn model_id(&self) -> &str {
        self.model_client.model_id()
    }

    fn build_request(
        &self,
        previous: Option<&SessionSummary>,
        conversation: &Conversation,
    ) -> ModelRequest {
        let mut system = SUMMARIZER_PROMPT.to_owned();
        if let Some(instructions) = &self.additional_instructions {
            system.push_str("\n\n");
            system.push_str(instructions.trim());
        }

        let mut input = String::new();
        if let Some(previous) = previous {
            input.push_str("Previous summary:\n");
            input.push_str(&previous.text);
            input.push_str("\n\n");
        }
        input.push_str("Conversation:\n");
        input.push_str(&conversation.transcript());

        ModelRequest::new(vec![
            ModelMessage::System(system),
            ModelMessage::User(input),
        ])
    }

    pub(crate) async fn summarize(
        &self,
        previous: Option<&SessionSummary>,
        conversation: &Conversation,
    ) -> Result<SessionSummary, Error> {
        let request = self.build_request(previous, conversation);
        let resp = self
            .model_client
            .send_request(request)
            .await
            .map_err(Error::Model)?;
        let text = resp.transcript.trim();
        if text.is_empty() {
            return Err(Error::EmptyResponse(resp.finish_reason));
        }
        Ok(SessionSummary {
            text: text.to_owned(),
            runs_covered: conversation.len(),
        })
    }
}

/// The memory policy of an agent.
///
/// Without a summarizer the memory stays empty and the agent relies on
/// its history window alone.
#[derive(Clone, Default)]
pub struct Memory {
    summarizer: Option<SessionSummarizer>,
    summary: Option<SessionSummary>,
}

impl Memory {
    /// Creates a memory that summarizes the session after every run.
    #[inline]
    pub fn with_summarizer(summarizer: SessionSummarizer) -> Self {
        Self {
            summarizer: Some(summarizer),
            summary: None,
        }
    }

    /// Returns the latest session summary.
    #[inline]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Returns `true` if session summaries are enabled.
    #[inline]
    pub fn summaries_enabled(&self) -> bool {
        self.summarizer.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.summary = None;
    }

    /// Refreshes the summary. Failures keep the previous summary.
    pub(crate) async fn update(&mut self, conversation: &Conversation) {
        let Some(summarizer) = &self.summarizer else {
            return;
        };
        let result =
            summarizer.summarize(self.summary.as_ref(), conversation).await;
        match result {
            Ok(summary) => {
                debug!("session summary covers {} run(s)", summary.runs_covered);
                self.summary = Some(summary);
            }
            Err(err) => warn!("failed to summarize the session: {err}"),
        }
    }
}
