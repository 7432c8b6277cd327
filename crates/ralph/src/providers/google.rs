use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use super::base::{Provider, Usage};
use super::configs::GoogleProviderConfig;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};

pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GOOGLE_MODEL: &str = "gemini-pro";

/// Google's generateContent API. The wire format has no tool-call
/// identifiers, so fresh ones are minted at parse time and function
/// responses are correlated back by the name recorded in the preceding
/// assistant message.
pub struct GoogleProvider {
    client: Client,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let meta = data.get("usageMetadata");
        Usage::new(
            meta.and_then(|m| m.get("promptTokenCount"))
                .and_then(Value::as_i64)
                .map(|v| v as i32),
            meta.and_then(|m| m.get("candidatesTokenCount"))
                .and_then(Value::as_i64)
                .map(|v| v as i32),
            meta.and_then(|m| m.get("totalTokenCount"))
                .and_then(Value::as_i64)
                .map(|v| v as i32),
        )
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.host.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        );

        let response = self.client.post(&url).json(&payload).send().await?;

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

/// Convert internal messages to generateContent `contents`. Roles are
/// user/model; tool results become functionResponse parts.
fn messages_to_google_spec(messages: &[Message]) -> Vec<Value> {
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    let mut contents = Vec::new();

    for message in messages {
        match message {
            Message::System { content } | Message::Human { content } => {
                contents.push(json!({
                    "role": "user",
                    "parts": [{"text": content}]
                }));
            }
            Message::Ai {
                content,
                tool_calls,
            } => {
                let mut parts = Vec::new();
                if !content.is_empty() {
                    parts.push(json!({"text": content}));
                }
                for call in tool_calls {
                    call_names.insert(call.id.as_str(), call.name.as_str());
                    parts.push(json!({
                        "functionCall": {
                            "name": call.name,
                            "args": call.arguments,
                        }
                    }));
                }
                if parts.is_empty() {
                    parts.push(json!({"text": ""}));
                }
                contents.push(json!({"role": "model", "parts": parts}));
            }
            Message::Tool {
                content,
                tool_call_id,
            } => {
                let name = call_names
                    .get(tool_call_id.as_str())
                    .copied()
                    .unwrap_or("tool");
                contents.push(json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "name": name,
                            "response": {"result": content},
                        }
                    }]
                }));
            }
        }
    }

    contents
}

fn tools_to_google_spec(tools: &[Tool]) -> Value {
    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            })
        })
        .collect();

    json!([{"functionDeclarations": declarations}])
}

fn google_response_to_message(response: &Value) -> Message {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in &parts {
        if let Some(fragment) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(fragment);
        }
        if let Some(call) = part.get("functionCall") {
            let name = call["name"].as_str().unwrap_or_default().to_string();
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
            tool_calls.push(ToolCall::new(Uuid::new_v4().to_string(), name, args));
        }
    }

    Message::ai_with_tool_calls(text, tool_calls)
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "systemInstruction": {"parts": [{"text": system}]},
            "contents": messages_to_google_spec(messages),
        });

        if !tools.is_empty() {
            payload
                .as_object_mut()
                .ok_or_else(|| anyhow!("Payload is not an object"))?
                .insert("tools".to_string(), tools_to_google_spec(tools));
        }
        if let Some(temp) = self.config.temperature {
            payload
                .as_object_mut()
                .ok_or_else(|| anyhow!("Payload is not an object"))?
                .insert("generationConfig".to_string(), json!({"temperature": temp}));
        }

        let response = self.post(payload).await?;

        let message = google_response_to_message(&response);
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, GoogleProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!(
                "/v1beta/models/{}:generateContent",
                GOOGLE_MODEL
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = GoogleProviderConfig {
            host: mock_server.uri(),
            model: GOOGLE_MODEL.to_string(),
            api_key: "fake_key".to_string(),
            temperature: Some(0.0),
        };

        let provider = GoogleProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello! How can I help?"}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 8,
                "candidatesTokenCount": 6,
                "totalTokenCount": 14
            }
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let messages = vec![Message::human("Hello?")];
        let (message, usage) = provider
            .complete("You are a helpful assistant.", &messages, &[])
            .await?;

        assert_eq!(message.content(), "Hello! How can I help?");
        assert!(message.tool_calls().is_empty());
        assert_eq!(usage.input_tokens, Some(8));
        assert_eq!(usage.output_tokens, Some(6));
        assert_eq!(usage.total_tokens, Some(14));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_function_call() -> Result<()> {
        let response_body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "list_files",
                            "args": {"path": "."}
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let messages = vec![Message::human("What is here?")];
        let tool = Tool::new(
            "list_files",
            "List a directory",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"}
                },
                "required": ["path"]
            }),
        );

        let (message, _usage) = provider
            .complete("You are a helpful assistant.", &messages, &[tool])
            .await?;

        let calls = message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "list_files");
        assert_eq!(calls[0].arguments, json!({"path": "."}));
        assert!(!calls[0].id.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_server_error() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let config = GoogleProviderConfig {
            host: mock_server.uri(),
            model: GOOGLE_MODEL.to_string(),
            api_key: "fake_key".to_string(),
            temperature: None,
        };

        let provider = GoogleProvider::new(config)?;
        let result = provider
            .complete("system", &[Message::human("Hello?")], &[])
            .await;

        assert!(result.unwrap_err().to_string().contains("Server error: 500"));

        Ok(())
    }

    #[test]
    fn test_function_response_correlated_by_name() {
        let messages = vec![
            Message::human("Read it"),
            Message::ai_with_tool_calls(
                "",
                vec![ToolCall::new("id_1", "read_file", json!({"path": "a.txt"}))],
            ),
            Message::tool("contents of a", "id_1"),
        ];

        let spec = messages_to_google_spec(&messages);

        assert_eq!(spec.len(), 3);
        assert_eq!(spec[1]["role"], "model");
        assert_eq!(spec[1]["parts"][0]["functionCall"]["name"], "read_file");
        assert_eq!(spec[2]["role"], "user");
        assert_eq!(
            spec[2]["parts"][0]["functionResponse"]["name"],
            "read_file"
        );
        assert_eq!(
            spec[2]["parts"][0]["functionResponse"]["response"]["result"],
            "contents of a"
        );
    }

    #[test]
    fn test_tools_to_google_spec() {
        let tool = Tool::new("done", "Signal completion", json!({"type": "object"}));
        let spec = tools_to_google_spec(&[tool]);
        assert_eq!(spec[0]["functionDeclarations"][0]["name"], "done");
    }
}
