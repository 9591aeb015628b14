//! Offline LLM client with canned replies.
//!
//! Replies are chosen by the first rule whose needle occurs in the prompt.
//! Every request is recorded so callers can assert on rendered prompts.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use concierge_core::{AppError, AppResult};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// Deterministic client for development and tests.
#[derive(Debug, Default)]
pub struct MockClient {
    rules: Vec<(String, Reply)>,
    fallback: Option<Reply>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` when the prompt contains `needle`.
    pub fn when(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules
            .push((needle.into(), Reply::Text(response.into())));
        self
    }

    /// Fail when the prompt contains `needle`.
    pub fn fail_when(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules
            .push((needle.into(), Reply::Fail(message.into())));
        self
    }

    /// Reply used when no rule matches. Without one, unmatched prompts error.
    pub fn otherwise(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(Reply::Text(response.into()));
        self
    }

    /// Fail every unmatched request.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fallback = Some(Reply::Fail(message.into()));
        self
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn pick(&self, prompt: &str) -> Option<&Reply> {
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .or(self.fallback.as_ref())
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        match self.pick(&request.prompt) {
            Some(Reply::Text(text)) => Ok(LlmResponse {
                content: text.clone(),
                model: request.model.clone(),
                usage: LlmUsage::new(request.prompt.len() as u32 / 4, text.len() as u32 / 4),
            }),
            Some(Reply::Fail(message)) => Err(AppError::Llm(message.clone())),
            None => Err(AppError::Llm("No canned reply for prompt".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let client = MockClient::new()
            .when("classify", "RAG")
            .when("class", "CONVERSATION")
            .otherwise("hello");

        let reply = client
            .complete(&LlmRequest::new("please classify this", "m"))
            .await
            .unwrap();
        assert_eq!(reply.content, "RAG");

        let reply = client
            .complete(&LlmRequest::new("something else", "m"))
            .await
            .unwrap();
        assert_eq!(reply.content, "hello");
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failures() {
        let client = MockClient::new().fail_when("boom", "exploded");
        assert!(client
            .complete(&LlmRequest::new("boom", "m"))
            .await
            .is_err());
        assert!(client
            .complete(&LlmRequest::new("unmatched", "m"))
            .await
            .is_err());
    }
}
