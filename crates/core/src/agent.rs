mod builder;
#[cfg(test)]
mod tests;

use research_agent_model::{ModelMessage, ModelRequest, ToolCallRequest};

use crate::Error;
use crate::conversation::{Conversation, Run};
use crate::memory::Memory;
use crate::model_client::ModelClient;
use crate::tool::Executor as ToolExecutor;
pub use builder::AgentBuilder;

/// The final answer of an agent run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResponse {
    /// The answer text.
    pub content: String,
    /// Every tool call the model made during the run, in order.
    pub tool_calls: Vec<ToolCallRequest>,
}

/// A conversational agent combining a model, a memory policy and tools.
///
/// Each call to [`Agent::run`] sends the instructions, the session
/// summary, the last few runs and the new input to the model, executes
/// the tools it asks for, and loops until the model produces an answer.
pub struct Agent {
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    conversation: Conversation,
    memory: Memory,
    instructions: Option<String>,
    num_history_runs: usize,
    max_iterations: usize,
}

impl Agent {
    /// Runs the agent on a user input and returns its answer.
    ///
    /// A failed run leaves the conversation untouched.
    pub async fn run<S: Into<String>>(
        &mut self,
        input: S,
    ) -> Result<RunResponse, Error> {
        let input = input.into();
        info!("run started ({} previous run(s))", self.conversation.len());

        let mut messages = vec![ModelMessage::User(input.clone())];
        let mut tool_calls = vec![];

        for iteration in 1..=self.max_iterations {
            let request = self.build_model_request(&messages);
            let resp = self
                .model_client
                .send_request(request)
                .await
                .map_err(Error::Model)?;
            messages.push(resp.history_message());

            if !resp.tool_calls.is_empty() {
                debug!(
                    "iteration {iteration}: {} tool call(s)",
                    resp.tool_calls.len()
                );
                let results = self
                    .tool_executor
                    .execute_all(resp.tool_calls.clone())
                    .await;
                messages.extend(results.into_iter().map(ModelMessage::Tool));
                tool_calls.extend(resp.tool_calls);
                continue;
            }

            if resp.transcript.trim().is_empty() {
                return Err(Error::EmptyResponse(resp.finish_reason));
            }

            let content = resp.transcript;
            self.conversation
                .push(Run::new(input, content.clone(), messages));
            self.memory.update(&self.conversation).await;
            info!("run finished after {iteration} model call(s)");
            return Ok(RunResponse {
                content,
                tool_calls,
            });
        }

        warn!("run aborted after {} model calls", self.max_iterations);
        Err(Error::TooManyIterations(self.max_iterations))
    }

    /// Returns the completed runs.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the memory of this agent.
    #[inline]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Returns the id of the model answering requests.
    #[inline]
    pub fn model_id(&self) -> &str {
        self.model_client.model_id()
    }

    /// Returns the names of the registered tools, sorted.
    #[inline]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_executor.tool_names()
    }

    /// Forgets all runs and the session summary.
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.memory.clear();
    }

    fn build_model_request(&self, current_run: &[ModelMessage]) -> ModelRequest {
        let mut messages = vec![];
        if let Some(system) = self.system_message() {
            messages.push(ModelMessage::System(system));
        }
        messages.extend(self.conversation.recent_messages(self.num_history_runs));
        messages.extend_from_slice(current_run);
        ModelRequest::new(messages).with_tools(self.tool_executor.definitions())
    }

    fn system_message(&self) -> Option<String> {
        let instructions = self.instructions.as_deref().map(str::trim);
        let summary = self.memory.summary();
        if instructions.is_none() && summary.is_none() {
            return None;
        }

        let mut system = instructions.unwrap_or_default().to_owned();
        if let Some(summary) = summary {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str(
                "Here is a summary of the earlier conversation with the user:\n\
                 <summary_of_previous_interactions>\n",
            );
            system.push_str(&summary.text);
            system.push_str("\n</summary_of_previous_interactions>");
        }
        Some(system)
    }
}
