//! OpenAI-compatible chat completion provider (`POST {base}/chat/completions`).
//!
//! Covers OpenAI itself, DashScope's compatible mode and self-hosted
//! servers that speak the same protocol. Wire types stay private.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use concierge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Client for any `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleClient {
    /// `api_key` may be `None` for keyless local servers.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_wire_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(Message {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let payload = self.to_wire_request(request);

        tracing::debug!(
            provider = %self.provider,
            model = %payload.model,
            temperature = ?payload.temperature,
            "Sending chat completion request"
        );

        let mut req = self.client.post(self.completions_url()).json(&payload);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            AppError::Llm(format!("Failed to send request to {}: {}", self.provider, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider, status, error_text
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse response: {}", e)))?;

        parsed.into_llm_response(&request.model)
    }
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl ChatCompletionResponse {
    fn into_llm_response(self, requested_model: &str) -> AppResult<LlmResponse> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Llm("Empty or missing content in response".to_string()))?;

        let usage = self
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_request_includes_system_first() {
        let client = OpenAiCompatibleClient::new("openai", OPENAI_BASE_URL, None).unwrap();
        let request = LlmRequest::new("What is RAG?", "gpt-4o-mini")
            .with_system("You are helpful")
            .with_temperature(0.3);

        let body = serde_json::to_value(client.to_wire_request(&request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "What is RAG?");
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn test_completions_url_strips_trailing_slash() {
        let client =
            OpenAiCompatibleClient::new("dashscope", format!("{}/", DASHSCOPE_BASE_URL), None)
                .unwrap();
        assert_eq!(
            client.completions_url(),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
        assert_eq!(client.provider_name(), "dashscope");
    }

    #[test]
    fn test_parse_first_choice() {
        let raw = r#"{
            "model": "qwen-plus",
            "choices": [{"message": {"role": "assistant", "content": "  WEBSEARCH "}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 3, "total_tokens": 23}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let response = parsed.into_llm_response("fallback").unwrap();

        assert_eq!(response.content, "WEBSEARCH");
        assert_eq!(response.model, "qwen-plus");
        assert_eq!(response.usage.total_tokens, 23);
    }

    #[test]
    fn test_empty_choices_is_error() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(parsed.into_llm_response("gpt-4o-mini").is_err());
    }
}
