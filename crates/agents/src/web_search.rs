//! Answers grounded in live web search results.

use crate::search::{SearchClient, SearchResult};
use crate::types::{AgentKind, AgentReply, Source, WebSourceRef};
use concierge_core::{AppResult, WebSearchSettings};
use concierge_llm::{LlmClient, LlmRequest};
use concierge_prompt::{format_labeled_history, render_prompt, ChatTurn, PromptKind, SettingsStore};
use std::collections::HashMap;
use std::sync::Arc;

pub const NO_RESULTS_REPLY: &str =
    "Sorry, no relevant search results were found. Please try rephrasing your question.";

const NO_TITLE: &str = "No title";
const NO_CONTENT: &str = "No content";

pub struct WebSearchAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    search: Arc<dyn SearchClient>,
    settings: WebSearchSettings,
    prompts: Arc<SettingsStore>,
}

impl WebSearchAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        search: Arc<dyn SearchClient>,
        settings: WebSearchSettings,
        prompts: Arc<SettingsStore>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            search,
            settings,
            prompts,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Search the web and answer from the results.
    ///
    /// Errors are reported in the reply text rather than returned.
    pub async fn search(&self, query: &str, history: &[ChatTurn]) -> AgentReply {
        match self.try_search(query, history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Web search failed: {}", e);
                AgentReply::new(
                    AgentKind::WebSearch,
                    format!("Search failed: {}. Please try again later.", e),
                )
            }
        }
    }

    async fn try_search(&self, query: &str, history: &[ChatTurn]) -> AppResult<AgentReply> {
        let search_query = self.search_query(query);
        let results = self
            .search
            .search(&search_query, self.settings.max_results)
            .await?;

        tracing::info!(
            "{} returned {} results for {:?}",
            self.search.provider_name(),
            results.len(),
            search_query
        );

        if results.is_empty() {
            return Ok(AgentReply::new(AgentKind::WebSearch, NO_RESULTS_REPLY));
        }

        let (formatted, sources) = self.format_results(&results);

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("search_results".to_string(), formatted);
        vars.insert(
            "conversation_history".to_string(),
            format_labeled_history(history, self.settings.history_window),
        );

        let template = self.prompts.prompt(PromptKind::WebSearch);
        let prompt = render_prompt(&template, &vars)?;

        let request = LlmRequest::new(prompt, &self.model)
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p);
        let response = self.llm.complete(&request).await?;

        Ok(AgentReply::new(AgentKind::WebSearch, response.content).with_sources(sources))
    }

    fn search_query(&self, query: &str) -> String {
        let prefix = self.settings.query_prefix.trim();
        if prefix.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", prefix, query)
        }
    }

    fn format_results(&self, results: &[SearchResult]) -> (String, Vec<Source>) {
        let mut formatted = String::new();
        let mut sources = Vec::with_capacity(results.len());

        for (i, result) in results.iter().enumerate() {
            let title = result.title.as_deref().unwrap_or(NO_TITLE);
            let body = result.body.as_deref().unwrap_or(NO_CONTENT);
            let link = result.href.as_deref().unwrap_or("");

            formatted.push_str(&format!(
                "\n[Result {}]\nTitle: {}\nContent: {}\nLink: {}\n",
                i + 1,
                title,
                body,
                link
            ));

            sources.push(Source::Web(WebSourceRef {
                title: title.to_string(),
                snippet: snippet(body, self.settings.snippet_chars),
                url: link.to_string(),
            }));
        }

        (formatted, sources)
    }
}

/// First `max_chars` characters followed by `...`.
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
