use std::future::ready;

use research_agent_model::{ErrorKind, ModelMessage, ToolCallRequest};
use research_agent_test_model::{
    EchoModelProvider, PresetEvent, PresetResponse, TestModelProvider,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::memory::{Memory, SessionSummarizer};
use crate::tool::{Tool, ToolResult};
use crate::{AgentBuilder, Error};

#[derive(Deserialize)]
struct CapitalInput {
    country: String,
}

struct CapitalTool {
    schema: Value,
}

impl CapitalTool {
    fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": { "country": { "type": "string" } },
                "required": ["country"]
            }),
        }
    }
}

impl Tool for CapitalTool {
    type Input = CapitalInput;

    fn name(&self) -> &str {
        "capital"
    }

    fn description(&self) -> &str {
        "Returns the capital of a country."
    }

    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let capital = match input.country.as_str() {
            "France" => "Paris",
            "Japan" => "Tokyo",
            _ => "unknown",
        };
        ready(Ok(capital.to_owned()))
    }
}

fn capital_call(id: &str, country: &str) -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest {
        id: id.to_owned(),
        name: "capital".to_owned(),
        arguments: json!({ "country": country }),
    })
}

fn system_text(messages: &[ModelMessage]) -> Option<&str> {
    messages.iter().find_map(|msg| match msg {
        ModelMessage::System(text) => Some(text.as_str()),
        _ => None,
    })
}

#[tokio::test]
async fn test_simple_message() {
    let model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("what can I research for you?".to_owned()),
    ]));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_instructions("  You are a research agent.\n")
        .build();
    assert_eq!(agent.model_id(), "test-model");

    let resp = agent.run("Hello").await.unwrap();
    assert_eq!(resp.content, "Hi, what can I research for you?");
    assert!(resp.tool_calls.is_empty());
    assert_eq!(agent.conversation().len(), 1);
    assert_eq!(agent.conversation().runs()[0].input(), "Hello");

    let requests = model_provider.requests();
    assert_eq!(
        requests[0].messages,
        vec![
            ModelMessage::System("You are a research agent.".to_owned()),
            ModelMessage::User("Hello".to_owned()),
        ]
    );
    assert!(requests[0].tools.is_empty());
}

#[tokio::test]
async fn test_tool_round_trip() {
    let model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        capital_call("call_1", "France"),
        capital_call("call_2", "Japan"),
    ]));
    model_provider.add_response(PresetResponse::text(
        "Paris and Tokyo, respectively.",
    ));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(CapitalTool::new())
        .build();
    assert_eq!(agent.tool_names(), vec!["capital"]);

    let resp = agent
        .run("What are the capitals of France and Japan?")
        .await
        .unwrap();
    assert_eq!(resp.content, "Paris and Tokyo, respectively.");
    let ids: Vec<_> = resp.tool_calls.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["call_1", "call_2"]);

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, "capital");

    let tool_results: Vec<_> = requests[1]
        .messages
        .iter()
        .filter_map(|msg| match msg {
            ModelMessage::Tool(result) => {
                Some((result.id.as_str(), result.content.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(tool_results, [("call_1", "Paris"), ("call_2", "Tokyo")]);

    // User input, tool call message, two results and the answer.
    assert_eq!(agent.conversation().runs()[0].messages().len(), 5);
}

#[tokio::test]
async fn test_history_window() {
    let mut agent = AgentBuilder::with_model_provider(EchoModelProvider::new(
        "ECHO: ",
    ))
    .with_num_history_runs(1)
    .build();

    for input in ["one", "two", "three"] {
        let resp = agent.run(input).await.unwrap();
        assert_eq!(resp.content, format!("ECHO: {input}"));
    }
    assert_eq!(agent.conversation().len(), 3);

    let model_provider = TestModelProvider::default();
    for _ in 0..3 {
        model_provider.add_response(PresetResponse::text("ok"));
    }
    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_num_history_runs(1)
        .build();
    for input in ["one", "two", "three"] {
        agent.run(input).await.unwrap();
    }
    let last = model_provider.requests().pop().unwrap();
    // Previous run (user + answer) and the new input only.
    assert_eq!(last.messages.len(), 3);
    assert_eq!(last.messages[0], ModelMessage::User("two".to_owned()));
    assert_eq!(last.messages[2], ModelMessage::User("three".to_owned()));
}

#[tokio::test]
async fn test_session_summary() {
    let model_provider = TestModelProvider::default();
    model_provider
        .add_response(PresetResponse::text("COBOL was designed in 1959."));
    model_provider.add_response(PresetResponse::text("Grace Hopper."));

    let summary_provider = TestModelProvider::default();
    summary_provider.add_response(PresetResponse::text(
        "  The user is researching COBOL.  ",
    ));
    summary_provider.add_response(PresetResponse::text(
        "The user is researching COBOL and its designers.",
    ));

    let summarizer =
        SessionSummarizer::with_model_provider(summary_provider.clone())
            .with_additional_instructions("Mention key topics researched.");
    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_instructions("Be concise.")
        .with_memory(Memory::with_summarizer(summarizer))
        .build();
    assert!(agent.memory().summaries_enabled());

    agent.run("When was COBOL designed?").await.unwrap();
    let summary = agent.memory().summary().unwrap();
    assert_eq!(summary.text, "The user is researching COBOL.");
    assert_eq!(summary.runs_covered, 1);

    agent.run("Who led the work?").await.unwrap();
    let second_request = &model_provider.requests()[1];
    let system = system_text(&second_request.messages).unwrap();
    assert!(system.starts_with("Be concise."));
    assert!(system.contains("The user is researching COBOL."));
    assert_eq!(agent.memory().summary().unwrap().runs_covered, 2);

    let summary_requests = summary_provider.requests();
    let summarizer_system = system_text(&summary_requests[0].messages).unwrap();
    assert!(summarizer_system.ends_with("Mention key topics researched."));
    let ModelMessage::User(input) = &summary_requests[1].messages[1] else {
        panic!("expected the transcript as user input");
    };
    assert!(
        input.starts_with("Previous summary:\nThe user is researching COBOL.")
    );
    assert!(input.contains("User: Who led the work?\nAssistant: Grace Hopper."));
}

#[tokio::test]
async fn test_summary_failure_is_not_fatal() {
    let summarizer = SessionSummarizer::with_model_provider(
        EchoModelProvider::failing(ErrorKind::RateLimitExceeded),
    );
    let mut agent =
        AgentBuilder::with_model_provider(EchoModelProvider::new("ECHO: "))
            .with_memory(Memory::with_summarizer(summarizer))
            .build();

    let resp = agent.run("hello").await.unwrap();
    assert_eq!(resp.content, "ECHO: hello");
    assert!(agent.memory().summary().is_none());
}

#[tokio::test]
async fn test_model_error_keeps_conversation() {
    let mut agent = AgentBuilder::with_model_provider(
        EchoModelProvider::failing(ErrorKind::Unauthorized),
    )
    .build();

    let err = agent.run("hello").await.unwrap_err();
    assert!(matches!(err, Error::Model(_)));
    assert_eq!(err.model_error_kind(), Some(ErrorKind::Unauthorized));
    assert!(agent.conversation().is_empty());
}

#[tokio::test]
async fn test_too_many_iterations() {
    let model_provider = TestModelProvider::default();
    for n in 0..3 {
        model_provider.add_response(PresetResponse::with_events([
            capital_call(&format!("call_{n}"), "France"),
        ]));
    }
    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(CapitalTool::new())
        .with_max_iterations(2)
        .build();

    let err = agent.run("Loop forever").await.unwrap_err();
    assert!(matches!(err, Error::TooManyIterations(2)));
    assert_eq!(model_provider.requests().len(), 2);
    assert!(agent.conversation().is_empty());
}

#[tokio::test]
async fn test_empty_answer() {
    let model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events(Vec::new()));
    let mut agent = AgentBuilder::with_model_provider(model_provider).build();

    let err = agent.run("Say nothing").await.unwrap_err();
    assert!(matches!(err, Error::EmptyResponse(_)));
}

#[tokio::test]
async fn test_reset() {
    let summarizer =
        SessionSummarizer::with_model_provider(EchoModelProvider::new(""));
    let mut agent =
        AgentBuilder::with_model_provider(EchoModelProvider::new("ECHO: "))
            .with_memory(Memory::with_summarizer(summarizer))
            .build();

    agent.run("hello").await.unwrap();
    assert!(agent.memory().summary().is_some());

    agent.reset();
    assert!(agent.conversation().is_empty());
    assert!(agent.memory().summary().is_none());
}
