//! Local fake models for testing code that talks to a model provider.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use research_agent_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    OpaqueMessage,
};
use tokio::time::Sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A response replaying a fixed list of events.
pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    opaque_msg: Option<OpaqueMessage>,
    delay: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn new(
        mut events: VecDeque<ModelResponseEvent>,
        finish_reason: ModelFinishReason,
        opaque_msg: Option<OpaqueMessage>,
        delay: Option<Duration>,
    ) -> Self {
        events.push_back(ModelResponseEvent::Completed(finish_reason));
        Self {
            events,
            opaque_msg,
            delay,
            sleep: None,
        }
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if let Some(delay) = this.delay {
            let sleep = this
                .sleep
                .get_or_insert_with(|| Box::pin(tokio::time::sleep(delay)));
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
        }
        Poll::Ready(Ok(this.events.pop_front()))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.opaque_msg.clone()
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    requests: Vec<ModelRequest>,
    answered: u64,
}

/// A scripted model for testing purpose.
///
/// Preset responses are handed out in the order they were added, one per
/// request. A preset with `failures` set makes that many requests fail
/// before it is consumed. Once the script runs out, requests fail.
///
/// Every request is recorded and can be inspected with
/// [`TestModelProvider::requests`]. Clones share the same script.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.lock().responses.push_back(preset);
    }

    /// Delays every event of the following responses.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, Error> {
        let mut script = self.lock();
        script.requests.push(req.clone());

        let Some(preset) = script.responses.front_mut() else {
            return Err(Error::new("no more preset responses", ErrorKind::Other));
        };
        match preset.failures {
            Some(0) => {
                return Err(Error::new("preset failure", ErrorKind::Other));
            }
            Some(n) => {
                preset.failures = if n == 1 { None } else { Some(n - 1) };
                return Err(Error::new("preset failure", ErrorKind::Other));
            }
            None => {}
        }

        let Some(preset) = script.responses.pop_front() else {
            unreachable!("front response disappeared");
        };
        script.answered += 1;

        let finish_reason = if preset.has_tool_call() {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        };
        let opaque_msg = OpaqueMessage::new(
            format!("test:{}", script.answered),
            preset.clone(),
        );
        let events = preset
            .events
            .into_iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(delta) => {
                    ModelResponseEvent::MessageDelta(delta)
                }
                PresetEvent::ToolCall(req) => ModelResponseEvent::ToolCall(req),
            })
            .collect();
        Ok(TestModelResponse::new(
            events,
            finish_reason,
            Some(opaque_msg),
            self.delay,
        ))
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn model_id(&self) -> &str {
        "test-model"
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.next_response(req))
    }
}

/// A model that answers with the latest user message behind a fixed
/// prefix, or always fails with a given error kind.
#[derive(Clone, Debug)]
pub struct EchoModelProvider {
    prefix: String,
    error: Option<ErrorKind>,
}

impl EchoModelProvider {
    /// Creates a provider answering `"{prefix}{input}"`.
    #[inline]
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            error: None,
        }
    }

    /// Creates a provider whose requests always fail with `kind`.
    #[inline]
    pub fn failing(kind: ErrorKind) -> Self {
        Self {
            prefix: String::new(),
            error: Some(kind),
        }
    }
}

impl ModelProvider for EchoModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn model_id(&self) -> &str {
        "echo"
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            if let Some(kind) = self.error {
                break 'blk Err(Error::new("echo model failure", kind));
            }
            let Some(input) =
                req.messages.iter().rev().find_map(|msg| match msg {
                    ModelMessage::User(text) => Some(text),
                    _ => None,
                })
            else {
                break 'blk Err(Error::new(
                    "no user message to echo",
                    ErrorKind::Other,
                ));
            };
            let events = [ModelResponseEvent::MessageDelta(format!(
                "{}{input}",
                self.prefix
            ))];
            Ok(TestModelResponse::new(
                events.into(),
                ModelFinishReason::Stop,
                None,
                None,
            ))
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use research_agent_model::{ModelTool, ToolCallRequest};
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Option<ToolCallRequest>, Option<ModelFinishReason>) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_call = None;
        let mut finish_reason = None;
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await.unwrap()
        {
            match event {
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason)
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(req) => tool_call = Some(req),
            }
        }
        (msg, tool_call, finish_reason)
    }

    #[tokio::test]
    async fn test_scripted_responses() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Let me check.".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "search_wikipedia".to_owned(),
                arguments: json!({ "query": "Alan Turing" }),
            }),
        ]));

        let req = ModelRequest::new(vec![ModelMessage::User("Hi".to_owned())])
            .with_tools(vec![ModelTool {
                name: "search_wikipedia".to_owned(),
                description: "Looks up Wikipedia".to_owned(),
                parameters: json!({ "type": "object" }),
            }]);
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert!(tool_call.is_none());
        assert_eq!(reason, Some(ModelFinishReason::Stop));

        let resp = provider.send_request(&req).await.unwrap();
        assert!(resp.make_opaque_message().is_some());
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Let me check.");
        assert_eq!(
            tool_call.unwrap().arguments,
            json!({ "query": "Alan Turing" })
        );
        assert_eq!(reason, Some(ModelFinishReason::ToolCalls));

        assert_eq!(provider.requests().len(), 2);
        assert!(provider.send_request(&req).await.is_err());
    }

    #[tokio::test]
    async fn test_preset_failures() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("finally").with_failures(2));
        let req = ModelRequest::new(vec![ModelMessage::User("Hi".to_owned())]);

        assert!(provider.send_request(&req).await.is_err());
        assert!(provider.send_request(&req).await.is_err());
        assert_eq!(provider.remaining(), 1);
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _, _) = collect_response(resp).await;
        assert_eq!(msg, "finally");
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_echo() {
        let provider = EchoModelProvider::new("ECHO: ");
        let req = ModelRequest::new(vec![
            ModelMessage::System("Be nice.".to_owned()),
            ModelMessage::User("first".to_owned()),
            ModelMessage::Assistant("ECHO: first".to_owned()),
            ModelMessage::User("hello".to_owned()),
        ]);
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _, _) = collect_response(resp).await;
        assert_eq!(msg, "ECHO: hello");

        let provider = EchoModelProvider::failing(ErrorKind::Unauthorized);
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
