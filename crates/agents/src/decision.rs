//! Intent classification: which agent should answer a query.

use crate::types::AgentKind;
use concierge_core::{AppResult, DecisionSettings};
use concierge_llm::{LlmClient, LlmRequest};
use concierge_prompt::{format_labeled_history, render_prompt, ChatTurn, PromptKind, SettingsStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub struct DecisionAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    settings: DecisionSettings,
    prompts: Arc<SettingsStore>,
}

impl DecisionAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: DecisionSettings,
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

    /// Pick an agent for `query`. Never fails: any error routes to
    /// [`AgentKind::Conversation`].
    pub async fn decide(&self, query: &str, history: &[ChatTurn]) -> AgentKind {
        match self.try_decide(query, history).await {
            Ok(kind) => {
                tracing::info!("Routing decision: {}", kind);
                kind
            }
            Err(e) => {
                tracing::error!("Routing decision failed: {}. Falling back to conversation", e);
                AgentKind::Conversation
            }
        }
    }

    async fn try_decide(&self, query: &str, history: &[ChatTurn]) -> AppResult<AgentKind> {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert(
            "conversation_history".to_string(),
            format_labeled_history(history, self.settings.history_window),
        );

        let template = self.prompts.prompt(PromptKind::Decision);
        let prompt = render_prompt(&template, &vars)?;

        let request = LlmRequest::new(prompt, &self.model)
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p);
        let response = self.llm.complete(&request).await?;

        tracing::debug!("Decision model replied {:?}", response.content);
        Ok(classify(&response.content))
    }

    /// Label to description for every agent.
    pub fn agent_info(&self) -> BTreeMap<&'static str, &'static str> {
        AgentKind::ALL
            .iter()
            .map(|kind| (kind.label(), kind.description()))
            .collect()
    }
}

/// Map free-form model output onto an agent.
///
/// Substring match on the upper-cased reply; `RAG` wins over `WEBSEARCH`
/// and anything else is conversation.
pub fn classify(reply: &str) -> AgentKind {
    let normalized = reply.trim().to_uppercase();
    if normalized.contains("RAG") {
        AgentKind::Rag
    } else if normalized.contains("WEBSEARCH") {
        AgentKind::WebSearch
    } else {
        AgentKind::Conversation
    }
}
