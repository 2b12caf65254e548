use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Accumulate another usage report into this one. Absent counts are
    /// treated as zero once either side has reported a number.
    pub fn merge(&mut self, other: &Usage) {
        fn add(a: Option<i32>, b: Option<i32>) -> Option<i32> {
            match (a, b) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
            }
        }
        self.input_tokens = add(self.input_tokens, other.input_tokens);
        self.output_tokens = add(self.output_tokens, other.output_tokens);
        self.total_tokens = add(self.total_tokens, other.total_tokens);
    }
}

/// A single event from a streaming completion.
#[derive(Debug, Clone)]
pub enum CompletionEvent {
    /// A text fragment, in production order
    TextDelta(String),
    /// The model requests a tool invocation; arguments are the fully
    /// accumulated JSON text (fragments are joined at the provider boundary)
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    /// Token accounting for the call
    Usage(Usage),
    /// The stream finished normally
    Done,
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<CompletionEvent>> + Send>>;

/// Base trait for completion providers (OpenAI-compatible servers, mocks).
///
/// A completion resolves to either a final text answer or one or more tool
/// requests carried on the returned message; the agent decides which by
/// inspecting the message content. Providers do not retry: failures
/// propagate to the caller of the agent run.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message for the given history and tool schemas
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)>;

    /// Streaming variant: text arrives as deltas; tool requests arrive as
    /// fully accumulated events; the stream is terminated by `Done`.
    async fn complete_streaming(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<CompletionStream>;
}
