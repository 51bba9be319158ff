use std::fmt::Write as _;

use reqwest::Client;
use research_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_NUM_RESULTS: i64 = 5;
const MAX_NUM_RESULTS: i64 = 10;

#[derive(Deserialize, JsonSchema)]
pub struct WebSearchToolParameters {
    #[schemars(description = "The search query.")]
    query: String,
    #[schemars(
        description = "How many results to return, 1 to 10. Defaults to 5."
    )]
    num_results: Option<i64>,
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerperResponse {
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct AnswerBox {
    title: Option<String>,
    answer: Option<String>,
    snippet: Option<String>,
}

#[derive(Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    snippet: Option<String>,
}

/// A tool for searching the web through the Serper API.
///
/// The tool is usable without an API key, but every call then fails with
/// a "not configured" error the model can relay to the user.
pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    parameter_schema: Value,
}

impl WebSearchTool {
    /// Creates a web search tool. An empty `api_key` counts as missing.
    pub fn new<S: Into<String>>(
        client: Client,
        api_key: Option<String>,
        base_url: S,
    ) -> Self {
        let base_url: String = base_url.into();
        WebSearchTool {
            client,
            api_key: api_key.filter(|key| !key.is_empty()),
            base_url: base_url.trim_end_matches('/').to_owned(),
            parameter_schema: schema_for!(WebSearchToolParameters).to_value(),
        }
    }
}

impl Tool for WebSearchTool {
    type Input = WebSearchToolParameters;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        r#"
Search the web with Google (via Serper).
Returns the answer box when there is one, followed by the top results
with their title, link and snippet."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: WebSearchToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = format!("{}/search", self.base_url);

        async move {
            let Some(api_key) = api_key else {
                return Err(ToolError::not_configured()
                    .with_reason("Serper API key is not configured"));
            };
            let num = input
                .num_results
                .unwrap_or(DEFAULT_NUM_RESULTS)
                .clamp(1, MAX_NUM_RESULTS) as u8;

            let resp = client
                .post(url)
                .header("X-API-KEY", api_key)
                .json(&SerperRequest {
                    q: &input.query,
                    num,
                })
                .send()
                .await
                .map_err(|err| {
                    ToolError::execution_error()
                        .with_reason(format!("search request failed: {err}"))
                })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ToolError::execution_error()
                    .with_reason(format!("Serper returned {status}: {body}")));
            }

            let results: SerperResponse = resp.json().await.map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("invalid search response: {err}"))
            })?;
            Ok(format_results(&input.query, results, num))
        }
    }
}

fn format_results(query: &str, results: SerperResponse, num: u8) -> String {
    let mut output = String::new();

    if let Some(answer_box) = results.answer_box {
        let answer = answer_box.answer.or(answer_box.snippet);
        if let Some(answer) = answer {
            match answer_box.title {
                Some(title) => {
                    _ = writeln!(output, "Answer ({title}): {answer}");
                }
                None => _ = writeln!(output, "Answer: {answer}"),
            }
            output.push('\n');
        }
    }

    for (n, result) in results.organic.iter().take(num as usize).enumerate() {
        _ = writeln!(output, "{}. {}", n + 1, result.title);
        _ = writeln!(output, "   {}", result.link);
        if let Some(snippet) = &result.snippet {
            _ = writeln!(output, "   {snippet}");
        }
    }

    if output.is_empty() {
        return format!("No results found for \"{query}\"");
    }
    output.truncate(output.trim_end().len());
    output
}
