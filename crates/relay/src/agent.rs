use std::sync::Arc;

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::providers::base::{CompletionEvent, Provider, Usage};
use crate::providers::utils::tool_request_from_wire;
use crate::registry::ToolRegistry;
use crate::thread::ConversationThread;

/// Bound on completion rounds within one run, guarding against a model that
/// perpetually requests tools.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// An agent binds a name, a system instruction, a tool registry, and a
/// completion provider.
///
/// Agents are immutable after construction and keep no session state: a run
/// operates on the thread passed by the caller, so one agent instance can
/// serve different threads in different sessions.
pub struct Agent {
    name: String,
    instructions: String,
    tools: ToolRegistry,
    provider: Arc<dyn Provider>,
    max_tool_rounds: usize,
}

/// The messages an agent produced during one run, in append order:
/// tool-round assistant messages, tool results, and the final assistant
/// answer last.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub messages: Vec<Message>,
    pub usage: Usage,
}

impl AgentResponse {
    /// Text of the last assistant message, i.e. the final answer.
    pub fn final_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == crate::models::role::Role::Assistant)
            .map(Message::text)
    }
}

impl Agent {
    pub fn new<N, I>(name: N, instructions: I, tools: ToolRegistry, provider: Arc<dyn Provider>) -> Self
    where
        N: Into<String>,
        I: Into<String>,
    {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools,
            provider,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Override the tool-loop bound.
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve `input` into a final response against `thread`.
    ///
    /// Appends the user input, then loops: completion, tool dispatch (in
    /// request order, sequentially), completion again, until the provider
    /// answers without tool requests. Each tool round is committed to the
    /// thread in one append, so cancellation mid-round leaves no partial
    /// round behind.
    pub async fn run(
        &self,
        input: &str,
        thread: &ConversationThread,
        cancel: &CancellationToken,
    ) -> AgentResult<AgentResponse> {
        thread.push(Message::user().with_text(input));

        let schemas = self.tools.schemas();
        let mut produced = Vec::new();
        let mut usage_total = Usage::default();

        for round in 0..self.max_tool_rounds {
            let snapshot = thread.messages();
            let completion = tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                result = self.provider.complete(&self.instructions, &snapshot, &schemas) => result,
            };
            let (mut message, usage) =
                completion.map_err(|e| AgentError::Provider(e.to_string()))?;
            usage_total.merge(&usage);
            message.author = self.name.clone();

            let requests: Vec<ToolRequest> =
                message.tool_requests().into_iter().cloned().collect();

            if requests.is_empty() {
                thread.push(message.clone());
                produced.push(message);
                tracing::debug!(agent = %self.name, rounds = round + 1, "run finished");
                return Ok(AgentResponse {
                    messages: produced,
                    usage: usage_total,
                });
            }

            let round_messages = self.dispatch_round(message, &requests).await;
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            thread.extend(round_messages.clone());
            produced.extend(round_messages);
        }

        Err(AgentError::ToolLoopExceeded(self.max_tool_rounds))
    }

    /// Streaming variant of [`Agent::run`]: the same state machine, but text
    /// deltas of the final completion are forwarded to the consumer as they
    /// arrive.
    ///
    /// A round stops forwarding once it produces its first tool-call event;
    /// the remainder of its text is logged and withheld (deltas already
    /// forwarded are never retracted). Tool rounds are committed to the
    /// thread all-or-nothing, exactly as in `run`, so a consumer that stops
    /// pulling mid-round leaves the thread without the partial round.
    pub fn run_streaming<'a>(
        &'a self,
        input: &'a str,
        thread: &'a ConversationThread,
        cancel: &'a CancellationToken,
    ) -> BoxStream<'a, AgentResult<String>> {
        Box::pin(try_stream! {
            thread.push(Message::user().with_text(input));

            let schemas = self.tools.schemas();
            let mut finished = false;

            for round in 0..self.max_tool_rounds {
                let snapshot = thread.messages();
                let opened = tokio::select! {
                    _ = cancel.cancelled() => Err(AgentError::Cancelled),
                    result = self.provider.complete_streaming(&self.instructions, &snapshot, &schemas) => {
                        result.map_err(|e| AgentError::Provider(e.to_string()))
                    }
                };
                let mut completion = opened?;

                let mut text = String::new();
                let mut requests: Vec<ToolRequest> = Vec::new();
                let mut suppressed = 0usize;

                loop {
                    let pulled = tokio::select! {
                        _ = cancel.cancelled() => Err(AgentError::Cancelled),
                        event = completion.next() => Ok(event),
                    };
                    let Some(event) = pulled? else {
                        break;
                    };
                    let event = event.map_err(|e| AgentError::Provider(e.to_string()))?;
                    match event {
                        CompletionEvent::TextDelta(delta) => {
                            text.push_str(&delta);
                            if requests.is_empty() {
                                yield delta;
                            } else {
                                suppressed += delta.len();
                            }
                        }
                        CompletionEvent::ToolCall { id, name, arguments } => {
                            requests.push(tool_request_from_wire(id, &name, &arguments));
                        }
                        CompletionEvent::Usage(_) => {}
                        CompletionEvent::Done => break,
                    }
                }

                if requests.is_empty() {
                    let mut message = Message::assistant(self.name.as_str());
                    if !text.is_empty() {
                        message = message.with_text(text);
                    }
                    thread.push(message);
                    tracing::debug!(agent = %self.name, rounds = round + 1, "streaming run finished");
                    finished = true;
                    break;
                }

                if suppressed > 0 {
                    tracing::debug!(
                        agent = %self.name,
                        bytes = suppressed,
                        "withheld text from tool round"
                    );
                }

                let mut message = Message::assistant(self.name.as_str());
                if !text.is_empty() {
                    message = message.with_text(text.as_str());
                }
                for request in &requests {
                    message = message.with_content(MessageContent::ToolRequest(request.clone()));
                }

                let round_messages = self.dispatch_round(message, &requests).await;
                if cancel.is_cancelled() {
                    Err(AgentError::Cancelled)?;
                }
                thread.extend(round_messages);
            }

            if !finished {
                Err(AgentError::ToolLoopExceeded(self.max_tool_rounds))?;
            }
        })
    }

    /// Dispatch every request of a tool round sequentially, in request
    /// order, and stage the assistant message plus one tool-result message
    /// per request. The caller commits the staged round atomically.
    async fn dispatch_round(
        &self,
        assistant_message: Message,
        requests: &[ToolRequest],
    ) -> Vec<Message> {
        let mut round_messages = vec![assistant_message];
        for request in requests {
            let result = match &request.tool_call {
                Ok(call) => self.tools.dispatch(call).await,
                Err(e) => Err(e.clone()),
            };
            round_messages.push(
                Message::tool(self.name.as_str()).with_tool_response(request.id.clone(), result),
            );
        }
        round_messages
    }
}
