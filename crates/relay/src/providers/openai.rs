use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::base::{CompletionStream, Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    messages_to_openai_spec, openai_response_to_message, tools_to_openai_spec, usage_from_response,
    SseParser,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Provider speaking the OpenAI `/v1/chat/completions` wire format, which
/// local servers such as LM Studio and Ollama also expose.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        )
    }

    fn build_payload(&self, system: &str, messages: &[Message], tools: &[Tool]) -> Result<Value> {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        let messages_spec = messages_to_openai_spec(messages);
        let tools_spec = if !tools.is_empty() {
            tools_to_openai_spec(tools)?
        } else {
            vec![]
        };

        let mut messages_array = vec![system_message];
        messages_array.extend(messages_spec);

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array
        });

        if !tools_spec.is_empty() {
            payload
                .as_object_mut()
                .unwrap()
                .insert("tools".to_string(), json!(tools_spec));
        }
        if let Some(temp) = self.config.temperature {
            payload
                .as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload
                .as_object_mut()
                .unwrap()
                .insert("max_tokens".to_string(), json!(tokens));
        }

        Ok(payload)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => Err(anyhow!(
                "Request failed: {}\nPayload: {}",
                response.status(),
                payload
            )),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let payload = self.build_payload(system, messages, tools)?;

        tracing::debug!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "sending completion request"
        );

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("OpenAI API error: {}", error));
        }

        let message = openai_response_to_message(response.clone())?;
        let usage = usage_from_response(&response).unwrap_or_default();

        Ok((message, usage))
    }

    async fn complete_streaming(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<CompletionStream> {
        let mut payload = self.build_payload(system, messages, tools)?;
        payload
            .as_object_mut()
            .unwrap()
            .insert("stream".to_string(), json!(true));
        payload.as_object_mut().unwrap().insert(
            "stream_options".to_string(),
            json!({ "include_usage": true }),
        );

        tracing::debug!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "sending streaming completion request"
        );

        let response = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Request failed: {status}: {text}"));
        }

        // SSE events can be split across TCP packets; the parser keeps a
        // line buffer across chunks and emits events for complete lines only.
        let byte_stream = response.bytes_stream();
        let event_stream = byte_stream
            .scan(SseParser::new(), |parser, chunk| {
                let events = match chunk {
                    Ok(bytes) => parser.feed(&String::from_utf8_lossy(&bytes)),
                    Err(e) => vec![Err(anyhow!(e))],
                };
                std::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::base::CompletionEvent;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response: ResponseTemplate) -> (MockServer, OpenAiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig::new(mock_server.uri(), "test_api_key", "gpt-4o-mini");
        let provider = OpenAiProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I assist you today?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (_, provider) =
            setup_mock_server(ResponseTemplate::new(200).set_body_json(response_body)).await;

        let messages = vec![Message::user().with_text("Hello?")];
        let (message, usage) = provider
            .complete("You are a helpful assistant.", &messages, &[])
            .await?;

        assert_eq!(message.text(), "Hello! How can I assist you today?");
        assert_eq!(usage.input_tokens, Some(12));
        assert_eq!(usage.output_tokens, Some(15));
        assert_eq!(usage.total_tokens, Some(27));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_request() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "patient_history",
                            "arguments": "{\"patient_name\":\"Juan Perez\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {
                "prompt_tokens": 20,
                "completion_tokens": 15,
                "total_tokens": 35
            }
        });

        let (_, provider) =
            setup_mock_server(ResponseTemplate::new(200).set_body_json(response_body)).await;

        let messages = vec![Message::user().with_text("Look up Juan Perez")];
        let tool = Tool::new("patient_history", "Looks up a patient history");

        let (message, _) = provider
            .complete("You are a helpful assistant.", &messages, &[tool])
            .await?;

        let requests = message.tool_requests();
        assert_eq!(requests.len(), 1);
        let tool_call = requests[0].tool_call.as_ref().unwrap();
        assert_eq!(tool_call.name, "patient_history");
        assert_eq!(tool_call.arguments, json!({"patient_name": "Juan Perez"}));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_server_error() -> Result<()> {
        let (_, provider) = setup_mock_server(ResponseTemplate::new(500)).await;

        let messages = vec![Message::user().with_text("Hello?")];
        let result = provider.complete("system", &messages, &[]).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Server error"));
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_streaming_text() -> Result<()> {
        let sse_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":2,\"total_tokens\":7}}\n\n",
            "data: [DONE]\n\n",
        );

        let (_, provider) = setup_mock_server(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body, "text/event-stream"),
        )
        .await;

        let messages = vec![Message::user().with_text("Hello?")];
        let mut stream = provider.complete_streaming("system", &messages, &[]).await?;

        let mut text = String::new();
        let mut saw_done = false;
        while let Some(event) = stream.next().await {
            match event? {
                CompletionEvent::TextDelta(delta) => text.push_str(&delta),
                CompletionEvent::Done => saw_done = true,
                _ => {}
            }
        }

        assert_eq!(text, "Hello world");
        assert!(saw_done);
        Ok(())
    }
}
