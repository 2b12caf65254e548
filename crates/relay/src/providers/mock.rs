use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{CompletionEvent, CompletionStream, Provider, Usage};

/// A mock provider that returns pre-configured responses, for tests and
/// offline development.
///
/// Responses are consumed front to back; once the script is exhausted the
/// provider either repeats its configured fallback or returns an empty
/// assistant message. The streaming variant replays the same script, text
/// split into word-sized deltas, so streaming and non-streaming runs over
/// one script produce identical final text.
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Message>>>,
    repeat: Option<Message>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            repeat: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that returns the same response on every call. Useful for
    /// driving the tool loop past its bound.
    pub fn repeating(response: Message) -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            repeat: Some(response),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completion calls made so far, across both call shapes.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Message {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            self.repeat
                .clone()
                .unwrap_or_else(|| Message::assistant("assistant").with_text(""))
        } else {
            responses.remove(0)
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        Ok((self.next_response(), Usage::default()))
    }

    async fn complete_streaming(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[Tool],
    ) -> Result<CompletionStream> {
        let message = self.next_response();

        let mut events: Vec<Result<CompletionEvent>> = Vec::new();
        for content in &message.content {
            match content {
                crate::models::message::MessageContent::Text(text) => {
                    // split_inclusive keeps the separators, so concatenating
                    // the deltas reproduces the text byte for byte
                    for delta in text.split_inclusive(' ') {
                        events.push(Ok(CompletionEvent::TextDelta(delta.to_string())));
                    }
                }
                crate::models::message::MessageContent::ToolRequest(request) => {
                    if let Ok(tool_call) = &request.tool_call {
                        events.push(Ok(CompletionEvent::ToolCall {
                            id: request.id.clone(),
                            name: tool_call.name.clone(),
                            arguments: tool_call.arguments.to_string(),
                        }));
                    }
                }
                crate::models::message::MessageContent::ToolResponse(_) => {}
            }
        }
        events.push(Ok(CompletionEvent::Done));

        Ok(Box::pin(futures::stream::iter(events)))
    }
}
