use std::collections::HashMap;

use futures_util::future::join_all;
use research_agent_model::{ModelTool, ToolCallRequest, ToolCallResult};
use tracing::Instrument;

use crate::tool::ToolObject;

/// Dispatches tool call requests from the model to registered tools.
pub struct Executor {
    tools: HashMap<String, Box<dyn ToolObject>>,
}

impl Executor {
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Self {
        let mut tool_map = HashMap::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name().to_owned();
            if tool_map.insert(name, tool).is_some() {
                warn!("a tool was registered twice, keeping the last one");
            }
        }
        Self { tools: tool_map }
    }

    /// Returns the tool definitions sorted by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        let mut definitions: Vec<_> = self
            .tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().trim().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Returns the registered tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs all requested tools concurrently.
    ///
    /// Every request gets exactly one result, in request order. Failures
    /// and unknown tools are reported as text so the model can recover.
    pub async fn execute_all(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<ToolCallResult> {
        let futures = requests.into_iter().map(|req| {
            let ToolCallRequest {
                id,
                name,
                arguments,
            } = req;
            let execution = self.tools.get(&name).map(|tool| {
                trace!("running tool `{name}` ({id}) with args: {arguments}");
                tool.execute(arguments)
            });
            let span = debug_span!("tool execute", tool = %name, id = %id);
            async move {
                let content = match execution {
                    Some(execution) => match execution.await {
                        Ok(output) => output,
                        Err(err) => {
                            warn!("tool failed: {err}");
                            format!("Error: {err}")
                        }
                    },
                    None => {
                        warn!("tool not found");
                        format!("Error: unknown tool `{name}`")
                    }
                };
                ToolCallResult { id, content }
            }
            .instrument(span)
        });
        join_all(futures).await
    }
}
