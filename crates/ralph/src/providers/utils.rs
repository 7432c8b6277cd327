use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};

/// Convert internal Message format to the OpenAI-compatible API message
/// specification used by the ollama endpoint.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match message {
            Message::System { content } => json!({
                "role": "system",
                "content": content,
            }),
            Message::Human { content } => json!({
                "role": "user",
                "content": content,
            }),
            Message::Ai {
                content,
                tool_calls,
            } => {
                let mut converted = json!({
                    "role": "assistant",
                    "content": content,
                });
                if !tool_calls.is_empty() {
                    let calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = json!(calls);
                }
                converted
            }
            Message::Tool {
                content,
                tool_call_id,
            } => json!({
                "role": "tool",
                "content": content,
                "tool_call_id": tool_call_id,
            }),
        })
        .collect()
}

/// Convert internal Tool format to the OpenAI-compatible tool specification
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
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert an OpenAI-compatible chat completion response to an assistant
/// Message. Unparseable tool arguments degrade to an empty mapping so the
/// failure surfaces as a tool-result error the model can observe.
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response["choices"][0]["message"].clone();

    let content = original
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = original.get("tool_calls").and_then(Value::as_array) {
        for call in calls {
            let id = match call["id"].as_str() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => Uuid::new_v4().to_string(),
            };
            let name = call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = call["function"]["arguments"].as_str().unwrap_or_default();
            let arguments: Value = serde_json::from_str(arguments).unwrap_or_else(|_| json!({}));
            tool_calls.push(ToolCall::new(id, name, arguments));
        }
    }

    Ok(Message::ai_with_tool_calls(content, tool_calls))
}
