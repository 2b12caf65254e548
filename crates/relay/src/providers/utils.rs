use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::{CompletionEvent, Usage};

/// Convert internal Message format to the OpenAI chat message specification.
///
/// Tool-request errors and tool results both become `role: tool` entries so
/// the model can see and react to failures; the `author` field is
/// orchestration metadata and is not sent.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.is_empty() {
                        converted["content"] = json!(text);
                    }
                }
                MessageContent::ToolRequest(request) => match &request.tool_call {
                    Ok(tool_call) => {
                        let sanitized_name = sanitize_function_name(&tool_call.name);
                        let tool_calls = converted
                            .as_object_mut()
                            .unwrap()
                            .entry("tool_calls")
                            .or_insert(json!([]));

                        tool_calls.as_array_mut().unwrap().push(json!({
                            "id": request.id,
                            "type": "function",
                            "function": {
                                "name": sanitized_name,
                                "arguments": tool_call.arguments.to_string(),
                            }
                        }));
                    }
                    Err(e) => {
                        output.push(json!({
                            "role": "tool",
                            "content": format!("Error: {}", e),
                            "tool_call_id": request.id
                        }));
                    }
                },
                MessageContent::ToolResponse(response) => match &response.tool_result {
                    Ok(result) => {
                        output.push(json!({
                            "role": "tool",
                            "content": result,
                            "tool_call_id": response.id
                        }));
                    }
                    Err(e) => {
                        // A tool result error is shown as output so the model can interpret the error message
                        output.push(json!({
                            "role": "tool",
                            "content": format!("The tool call returned the following error:\n{}", e),
                            "tool_call_id": response.id
                        }));
                    }
                },
            }
        }

        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal Tool format to the OpenAI tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema(),
            }
        }));
    }

    Ok(result)
}

/// Build a ToolRequest from wire-level parts, capturing malformed names and
/// unparseable argument payloads as request errors the model will see.
pub fn tool_request_from_wire(id: String, function_name: &str, arguments: &str) -> ToolRequest {
    if !is_valid_function_name(function_name) {
        let error = AgentError::ToolNotFound(format!(
            "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
            function_name
        ));
        return ToolRequest {
            id,
            tool_call: Err(error),
        };
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(params) => ToolRequest {
            id,
            tool_call: Ok(ToolCall::new(function_name, params)),
        },
        Err(e) => {
            let error = AgentError::InvalidParameters(format!(
                "Could not interpret tool use parameters for id {}: {}",
                id, e
            ));
            ToolRequest {
                id,
                tool_call: Err(error),
            }
        }
    }
}

/// Convert an OpenAI chat completion response to internal Message format.
///
/// The author is a placeholder; the agent stamps its own name on every
/// message it appends.
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response["choices"][0]["message"].clone();
    let mut message = Message::assistant("assistant");

    if let Some(text) = original.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            message = message.with_text(text);
        }
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(Value::as_array) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"].as_str().unwrap_or_default();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();

            let request = tool_request_from_wire(id, function_name, arguments);
            message = message.with_content(MessageContent::ToolRequest(request));
        }
    }

    Ok(message)
}

pub fn usage_from_response(data: &Value) -> Result<Usage> {
    let usage = data
        .get("usage")
        .ok_or_else(|| anyhow!("No usage data in response"))?;
    Ok(parse_usage(usage))
}

fn parse_usage(usage: &Value) -> Usage {
    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let output_tokens = usage
        .get("completion_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let total_tokens = usage
        .get("total_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });
    Usage::new(input_tokens, output_tokens, total_tokens)
}

fn sanitize_function_name(name: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    re.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
    re.is_match(name)
}

/// Incremental parser for the OpenAI SSE streaming wire format.
///
/// SSE events can be split across TCP packets, so a line buffer is kept
/// across chunks and events are emitted only for complete lines. Tool-call
/// deltas arrive fragmented (`index` addresses the call, `id`/`name`/
/// `arguments` accumulate across chunks); they are flushed as whole
/// [`CompletionEvent::ToolCall`] events when the choice finishes or the
/// stream ends.
#[derive(Default)]
pub struct SseParser {
    line_buf: String,
    partial_calls: Vec<PartialToolCall>,
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the response body; returns the events completed
    /// by this chunk. Any trailing incomplete line stays buffered.
    pub fn feed(&mut self, chunk: &str) -> Vec<Result<CompletionEvent>> {
        self.line_buf.push_str(chunk);
        let mut events = Vec::new();
        while let Some(nl_pos) = self.line_buf.find('\n') {
            let line = self.line_buf[..nl_pos].trim_end_matches('\r').to_string();
            self.line_buf = self.line_buf[nl_pos + 1..].to_string();
            self.parse_line(&line, &mut events);
        }
        events
    }

    fn parse_line(&mut self, line: &str, events: &mut Vec<Result<CompletionEvent>>) {
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data.is_empty() {
            return;
        }
        if data == "[DONE]" {
            self.flush_tool_calls(events);
            events.push(Ok(CompletionEvent::Done));
            return;
        }
        let Ok(value) = serde_json::from_str::<Value>(data) else {
            return;
        };
        self.parse_chunk(&value, events);
    }

    fn parse_chunk(&mut self, value: &Value, events: &mut Vec<Result<CompletionEvent>>) {
        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            events.push(Err(anyhow!("provider error mid-stream: {}", error)));
            return;
        }

        if let Some(usage) = value.get("usage").filter(|u| !u.is_null()) {
            events.push(Ok(CompletionEvent::Usage(parse_usage(usage))));
        }

        let choice = &value["choices"][0];
        let delta = &choice["delta"];

        if let Some(text) = delta.get("content").and_then(Value::as_str) {
            if !text.is_empty() {
                events.push(Ok(CompletionEvent::TextDelta(text.to_string())));
            }
        }

        if let Some(fragments) = delta.get("tool_calls").and_then(Value::as_array) {
            for fragment in fragments {
                let index = fragment.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                if self.partial_calls.len() <= index {
                    self.partial_calls
                        .resize_with(index + 1, PartialToolCall::default);
                }
                let partial = &mut self.partial_calls[index];
                if let Some(id) = fragment.get("id").and_then(Value::as_str) {
                    partial.id.push_str(id);
                }
                if let Some(name) = fragment["function"].get("name").and_then(Value::as_str) {
                    partial.name.push_str(name);
                }
                if let Some(args) = fragment["function"]
                    .get("arguments")
                    .and_then(Value::as_str)
                {
                    partial.arguments.push_str(args);
                }
            }
        }

        if choice.get("finish_reason").and_then(Value::as_str) == Some("tool_calls") {
            self.flush_tool_calls(events);
        }
    }

    fn flush_tool_calls(&mut self, events: &mut Vec<Result<CompletionEvent>>) {
        for partial in self.partial_calls.drain(..) {
            if partial.name.is_empty() {
                continue;
            }
            // Some local servers omit call ids; the thread protocol needs
            // one to pair the result with the request.
            let id = if partial.id.is_empty() {
                uuid::Uuid::new_v4().to_string()
            } else {
                partial.id
            };
            let arguments = if partial.arguments.is_empty() {
                "{}".to_string()
            } else {
                partial.arguments
            };
            events.push(Ok(CompletionEvent::ToolCall {
                id,
                name: partial.name,
                arguments,
            }));
        }
    }
}
