use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use research_agent_model::{
    ModelFinishReason, ModelMessage, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
    ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A type-erased model provider that drains streaming responses into
/// complete [`ModelClientResponse`]s.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    model_id: Arc<str>,
}

impl ModelClient {
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let model_id: Arc<str> = Arc::from(provider.model_id());
        let span_model_id = Arc::clone(&model_id);
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            let span = debug_span!(
                "model request",
                model = %span_model_id,
                messages = req.messages.len(),
            );
            Box::pin(
                async move {
                    trace!("sending request: {req:?}");
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(span),
            )
        });
        Self {
            handler_fn,
            model_id,
        }
    }

    #[inline]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Sends a request and waits for the complete response.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future stops streaming the response.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    pub transcript: String,
    pub opaque_msg: Option<OpaqueMessage>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<ModelFinishReason>,
}

impl ModelClientResponse {
    /// The message to keep in history for this response.
    pub fn history_message(&self) -> ModelMessage {
        match &self.opaque_msg {
            Some(opaque_msg) => ModelMessage::Opaque(opaque_msg.clone()),
            // Downgrade to a text-only message.
            None => ModelMessage::Assistant(self.transcript.clone()),
        }
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("request failed: {err}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    let mut pinned_resp = pin!(resp);
    loop {
        let event = poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx))
            .await
            .map_err(|err| {
                error!("response failed: {err}");
                Box::new(err) as Box<dyn ModelProviderError>
            })?;
        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                transcript.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }
    let opaque_msg = pinned_resp.make_opaque_message();

    debug!(
        "response finished: {finish_reason:?}, {} tool call(s)",
        tool_calls.len()
    );

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use research_agent_model::ErrorKind;
    use research_agent_test_model::{
        EchoModelProvider, PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn hi() -> ModelRequest {
        ModelRequest::new(vec![ModelMessage::User("Hi".to_owned())])
    }

    #[tokio::test]
    async fn test_send_request() {
        let model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider);
        assert_eq!(model_client.model_id(), "test-model");

        for _ in 0..3 {
            let resp = model_client.send_request(hi()).await.unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
            assert!(matches!(resp.history_message(), ModelMessage::Opaque(_)));
        }
    }

    #[tokio::test]
    async fn test_text_only_history_message() {
        let model_client = ModelClient::new(EchoModelProvider::new("> "));
        let resp = model_client.send_request(hi()).await.unwrap();
        assert_eq!(
            resp.history_message(),
            ModelMessage::Assistant("> Hi".to_owned())
        );
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_client = ModelClient::new(TestModelProvider::default());
        let err = model_client.send_request(hi()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);

        let model_client =
            ModelClient::new(EchoModelProvider::failing(ErrorKind::Unauthorized));
        let err = model_client.send_request(hi()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
