use research_agent_model::ModelProvider;

use super::Agent;
use crate::memory::Memory;
use crate::model_client::ModelClient;
use crate::tool::{AnyTool, Executor as ToolExecutor, Tool, ToolObject};

const DEFAULT_NUM_HISTORY_RUNS: usize = 3;
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: Vec<Box<dyn ToolObject>>,
    memory: Memory,
    instructions: Option<String>,
    num_history_runs: usize,
    max_iterations: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: vec![],
            memory: Memory::default(),
            instructions: None,
            num_history_runs: DEFAULT_NUM_HISTORY_RUNS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Sets the system instructions.
    #[inline]
    pub fn with_instructions<S: Into<String>>(mut self, instructions: S) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(AnyTool(tool)));
        self
    }

    /// Sets the memory policy.
    #[inline]
    pub fn with_memory(mut self, memory: Memory) -> Self {
        self.memory = memory;
        self
    }

    /// Sets how many previous runs are sent along with each request.
    /// Defaults to 3.
    #[inline]
    pub fn with_num_history_runs(mut self, num_history_runs: usize) -> Self {
        self.num_history_runs = num_history_runs;
        self
    }

    /// Sets how many model calls a single run may make. Defaults to 10.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        Agent {
            model_client: self.model_client,
            tool_executor: ToolExecutor::with_tools(self.tools),
            conversation: Default::default(),
            memory: self.memory,
            instructions: self.instructions,
            num_history_runs: self.num_history_runs,
            max_iterations: self.max_iterations,
        }
    }
}
