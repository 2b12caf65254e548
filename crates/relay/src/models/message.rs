use chrono::Utc;

use super::role::Role;
use super::tool::ToolCall;
use crate::errors::AgentResult;

/// Author name used for end-user input messages.
pub const USER_AUTHOR: &str = "user";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool_call: AgentResult<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub tool_result: AgentResult<String>,
}

/// Content passed inside a message, which can be both plain text and tool traffic
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MessageContent {
    Text(String),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn tool_request<S: Into<String>>(id: S, tool_call: AgentResult<ToolCall>) -> Self {
        MessageContent::ToolRequest(ToolRequest {
            id: id.into(),
            tool_call,
        })
    }

    pub fn tool_response<S: Into<String>>(id: S, tool_result: AgentResult<String>) -> Self {
        MessageContent::ToolResponse(ToolResponse {
            id: id.into(),
            tool_result,
        })
    }

    /// Get the text if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_request(&self) -> Option<&ToolRequest> {
        if let MessageContent::ToolRequest(ref tool_request) = self {
            Some(tool_request)
        } else {
            None
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        if let MessageContent::ToolResponse(ref tool_response) = self {
            Some(tool_response)
        } else {
            None
        }
    }
}

/// A message in a conversation thread.
///
/// `author` is orchestration metadata ("user" or an agent name); it never
/// goes over the wire. Messages are immutable once appended to a thread.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub author: String,
    pub created: i64,
    pub content: Vec<MessageContent>,
}

impl Message {
    fn new<S: Into<String>>(role: Role, author: S) -> Self {
        Message {
            role,
            author: author.into(),
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message::new(Role::User, USER_AUTHOR)
    }

    /// Create a new assistant message authored by the given agent
    pub fn assistant<S: Into<String>>(author: S) -> Self {
        Message::new(Role::Assistant, author)
    }

    /// Create a new tool-result message authored by the given agent
    pub fn tool<S: Into<String>>(author: S) -> Self {
        Message::new(Role::Tool, author)
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add a tool request to the message
    pub fn with_tool_request<S: Into<String>>(
        self,
        id: S,
        tool_call: AgentResult<ToolCall>,
    ) -> Self {
        self.with_content(MessageContent::tool_request(id, tool_call))
    }

    /// Add a tool response to the message
    pub fn with_tool_response<S: Into<String>>(
        self,
        id: S,
        result: AgentResult<String>,
    ) -> Self {
        self.with_content(MessageContent::tool_response(id, result))
    }

    /// All text content of the message, concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| content.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// All tool requests carried by the message, in order.
    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.content
            .iter()
            .filter_map(|content| content.as_tool_request())
            .collect()
    }

    pub fn has_tool_requests(&self) -> bool {
        self.content
            .iter()
            .any(|content| content.as_tool_request().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders_set_role_and_author() {
        let message = Message::user().with_text("hello");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.author, USER_AUTHOR);
        assert_eq!(message.text(), "hello");

        let message = Message::assistant("triage").with_text("hi");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.author, "triage");
    }

    #[test]
    fn test_tool_requests_preserve_order() {
        let message = Message::assistant("triage")
            .with_tool_request("1", Ok(ToolCall::new("first", json!({}))))
            .with_tool_request("2", Ok(ToolCall::new("second", json!({}))));

        let requests = message.tool_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].id, "1");
        assert_eq!(requests[1].id, "2");
        assert!(message.has_tool_requests());
    }

    #[test]
    fn test_text_concatenates_only_text_content() {
        let message = Message::assistant("triage")
            .with_text("part one")
            .with_tool_request("1", Ok(ToolCall::new("noop", json!({}))))
            .with_text(" part two");
        assert_eq!(message.text(), "part one part two");
    }
}
