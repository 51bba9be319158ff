use std::fmt::Write as _;
use std::future::ready;

use research_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, JsonSchema)]
pub struct ThinkToolParameters {
    #[schemars(description = "A short title for this step.")]
    title: String,
    #[schemars(description = "Your reasoning for this step.")]
    thought: String,
    #[schemars(description = "What you will do next.")]
    action: Option<String>,
    #[schemars(description = "How confident you are, from 0.0 to 1.0.")]
    confidence: Option<f64>,
}

#[derive(Deserialize, JsonSchema)]
pub struct AnalyzeToolParameters {
    #[schemars(description = "A short title for this analysis.")]
    title: String,
    #[schemars(description = "The outcome of the previous step.")]
    result: String,
    #[schemars(description = "What the result means for the question.")]
    analysis: String,
    #[schemars(
        description = "Whether to continue, validate, or give the final answer."
    )]
    next_action: Option<NextAction>,
    #[schemars(description = "How confident you are, from 0.0 to 1.0.")]
    confidence: Option<f64>,
}

/// What the model plans to do after an analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Keep researching.
    Continue,
    /// Double-check the findings.
    Validate,
    /// Answer the user.
    FinalAnswer,
}

impl NextAction {
    fn as_str(self) -> &'static str {
        match self {
            NextAction::Continue => "continue",
            NextAction::Validate => "validate",
            NextAction::FinalAnswer => "final_answer",
        }
    }
}

fn check_confidence(confidence: Option<f64>) -> Result<(), ToolError> {
    match confidence {
        Some(value) if !(0.0..=1.0).contains(&value) => Err(
            ToolError::invalid_input()
                .with_reason("`confidence` must be between 0.0 and 1.0"),
        ),
        _ => Ok(()),
    }
}

/// A scratchpad tool that lets the model reason step by step.
///
/// The thought is echoed back and has no other effect.
pub struct ThinkTool {
    parameter_schema: Value,
}

impl ThinkTool {
    /// Creates a new think tool.
    #[inline]
    pub fn new() -> Self {
        ThinkTool {
            parameter_schema: schema_for!(ThinkToolParameters).to_value(),
        }
    }
}

impl Default for ThinkTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ThinkTool {
    type Input = ThinkToolParameters;

    fn name(&self) -> &str {
        "think"
    }

    fn description(&self) -> &str {
        r#"
Use this tool as a scratchpad to plan your research before acting.
Break the question down, decide which sources to consult, and note your
confidence."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: ThinkToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = check_confidence(input.confidence).map(|_| {
            let mut output =
                format!("Thought: {}\n{}", input.title, input.thought);
            if let Some(action) = &input.action {
                _ = write!(output, "\nAction: {action}");
            }
            if let Some(confidence) = input.confidence {
                _ = write!(output, "\nConfidence: {confidence}");
            }
            output
        });
        ready(result)
    }
}

/// A tool for evaluating the result of a research step.
pub struct AnalyzeTool {
    parameter_schema: Value,
}

impl AnalyzeTool {
    /// Creates a new analyze tool.
    #[inline]
    pub fn new() -> Self {
        AnalyzeTool {
            parameter_schema: schema_for!(AnalyzeToolParameters).to_value(),
        }
    }
}

impl Default for AnalyzeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for AnalyzeTool {
    type Input = AnalyzeToolParameters;

    fn name(&self) -> &str {
        "analyze"
    }

    fn description(&self) -> &str {
        r#"
Use this tool after a search or lookup to evaluate what you found.
Decide whether to continue researching, validate the findings, or give
the final answer."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: AnalyzeToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = check_confidence(input.confidence).map(|_| {
            let mut output = format!(
                "Analysis: {}\nResult: {}\n{}",
                input.title, input.result, input.analysis
            );
            if let Some(next_action) = input.next_action {
                _ = write!(output, "\nNext action: {}", next_action.as_str());
            }
            if let Some(confidence) = input.confidence {
                _ = write!(output, "\nConfidence: {confidence}");
            }
            output
        });
        ready(result)
    }
}
