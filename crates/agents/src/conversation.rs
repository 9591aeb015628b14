//! Plain chat with the conversation history as context.

use crate::types::{AgentKind, AgentReply};
use concierge_core::{AppResult, ConversationSettings};
use concierge_llm::{LlmClient, LlmRequest};
use concierge_prompt::{format_dialogue_history, render_prompt, ChatTurn, PromptKind, SettingsStore};
use std::collections::HashMap;
use std::sync::Arc;

pub const CONVERSATION_ERROR_REPLY: &str =
    "Sorry, something went wrong while handling your request. Please try again later.";

pub struct ConversationAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    settings: ConversationSettings,
    prompts: Arc<SettingsStore>,
}

impl ConversationAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: ConversationSettings,
        prompts: Arc<SettingsStore>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            settings,
            prompts,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat(&self, query: &str, history: &[ChatTurn]) -> AgentReply {
        match self.try_chat(query, history).await {
            Ok(text) => AgentReply::new(AgentKind::Conversation, text),
            Err(e) => {
                tracing::error!("Conversation agent failed: {}", e);
                AgentReply::new(AgentKind::Conversation, CONVERSATION_ERROR_REPLY)
            }
        }
    }

    async fn try_chat(&self, query: &str, history: &[ChatTurn]) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert(
            "conversation_history".to_string(),
            format_dialogue_history(history, self.settings.context_limit),
        );

        let template = self.prompts.prompt(PromptKind::Conversation);
        let prompt = render_prompt(&template, &vars)?;

        let request = LlmRequest::new(prompt, &self.model)
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p);
        Ok(self.llm.complete(&request).await?.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_llm::MockClient;
    use concierge_prompt::{UserSettings, CONVERSATION_START};

    fn agent(llm: Arc<MockClient>, context_limit: usize) -> ConversationAgent {
        ConversationAgent::new(
            llm,
            "qwen-plus",
            ConversationSettings {
                context_limit,
                ..Default::default()
            },
            Arc::new(SettingsStore::in_memory(UserSettings::default())),
        )
    }

    #[tokio::test]
    async fn test_chat_replies_with_model_output() {
        let llm = Arc::new(MockClient::new().otherwise("Hello! How can I help?"));
        let reply = agent(llm.clone(), 20).chat("hello", &[]).await;

        assert_eq!(reply.agent, "Conversation Agent");
        assert_eq!(reply.response, "Hello! How can I help?");
        assert!(reply.sources.is_empty());
        assert!(reply.confidence.is_none());

        let request = &llm.requests()[0];
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.prompt.contains(CONVERSATION_START));
        assert!(request.prompt.contains("User: hello"));
    }

    #[tokio::test]
    async fn test_chat_limits_history() {
        let llm = Arc::new(MockClient::new().otherwise("ok"));
        let history = vec![
            ChatTurn::user("first question"),
            ChatTurn::assistant("first answer"),
            ChatTurn::user("second question"),
            ChatTurn::assistant("second answer"),
        ];

        agent(llm.clone(), 2).chat("third", &history).await;

        let prompt = &llm.requests()[0].prompt;
        assert!(!prompt.contains("first question"));
        assert!(prompt.contains("User: second question\nAssistant: second answer\n"));
    }

    #[tokio::test]
    async fn test_chat_error_gives_apology() {
        let llm = Arc::new(MockClient::new().failing("timeout"));
        let reply = agent(llm, 20).chat("hello", &[]).await;
        assert_eq!(reply.response, CONVERSATION_ERROR_REPLY);
    }
}
