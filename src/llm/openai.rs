use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatTurn, CompletionRequest, Role, ToolCall};
use crate::core::config::LlmConfig;
use crate::core::errors::AiError;

/// Chat-completion client for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<ChatTurn, AiError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if let Some(tools) = &request.tools {
                if !tools.is_empty() {
                    obj.insert("tools".to_string(), json!(tools));
                }
            }
        }

        let mut req = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let res = req.send().await.map_err(|e| AiError::provider("llm", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AiError::Provider {
                provider: "llm",
                message: format!("chat completion failed ({}): {}", status, text),
            });
        }

        let payload: Value = res.json().await.map_err(|e| AiError::provider("llm", e))?;
        let message = &payload["choices"][0]["message"];

        let content = message["content"].as_str().unwrap_or_default().to_string();
        let tool_calls = message
            .get("tool_calls")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value::<Vec<ToolCall>>(v.clone()).ok())
            .filter(|calls| !calls.is_empty());

        Ok(ChatTurn {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
            name: None,
        })
    }
}
