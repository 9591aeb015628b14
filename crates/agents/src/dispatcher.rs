//! Routes a chat request through the decision step to one agent.

use crate::conversation::ConversationAgent;
use crate::decision::DecisionAgent;
use crate::rag::RagAgent;
use crate::session::SessionStore;
use crate::types::{AgentKind, AgentReply, ChatRequest, ChatResponse, LlmCall, RoutingInfo};
use crate::web_search::WebSearchAgent;
use concierge_core::{AppError, AppResult};
use concierge_prompt::{ChatTurn, Role, SettingsStore};
use std::sync::Arc;

const DECISION_AGENT_NAME: &str = "Decision Agent";
const RAG_DISABLED_DECISION: &str = "RAG (disabled) -> CONVERSATION";

/// Owns the agents and the session store; one instance serves all requests.
pub struct ChatRouter {
    decision: DecisionAgent,
    conversation: ConversationAgent,
    web_search: WebSearchAgent,
    rag: RagAgent,
    sessions: Arc<SessionStore>,
    settings: Arc<SettingsStore>,
}

impl ChatRouter {
    pub fn new(
        decision: DecisionAgent,
        conversation: ConversationAgent,
        web_search: WebSearchAgent,
        rag: RagAgent,
        sessions: Arc<SessionStore>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            decision,
            conversation,
            web_search,
            rag,
            sessions,
            settings,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn decision(&self) -> &DecisionAgent {
        &self.decision
    }

    pub fn rag(&self) -> &RagAgent {
        &self.rag
    }

    /// Handle one chat turn.
    ///
    /// The query is recorded in the session before routing, so the history
    /// the agents see ends with it.
    pub async fn handle(&self, request: ChatRequest) -> AppResult<ChatResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(AppError::Other("Query must not be empty".to_string()));
        }

        let (session_id, prior) = self
            .sessions
            .get_or_create(request.session_id.as_deref())
            .await;

        if prior.is_empty() {
            if let Some(seed) = request.conversation_history.filter(|h| !h.is_empty()) {
                let turns = seed.len();
                if self.sessions.seed(&session_id, seed).await {
                    tracing::debug!(
                        "Seeded session {} with {} turns from the request",
                        session_id,
                        turns
                    );
                }
            }
        }

        self.sessions
            .add_message(&session_id, Role::User, query)
            .await;
        let history = self
            .sessions
            .history(&session_id)
            .await
            .unwrap_or_default();

        let decided = self.decision.decide(query, &history).await;
        let rag_disabled = decided == AgentKind::Rag && !self.settings.is_rag_enabled();
        let (executed, decision_label) = if rag_disabled {
            tracing::info!("RAG is disabled, answering with the conversation agent");
            (AgentKind::Conversation, RAG_DISABLED_DECISION.to_string())
        } else {
            (decided, decided.label().to_string())
        };

        let reply = self
            .run_agent(executed, query, &history, request.knowledge_bases.as_deref())
            .await;

        self.sessions
            .add_message(&session_id, Role::Assistant, reply.response.clone())
            .await;

        let llm_calls = vec![
            LlmCall {
                agent: DECISION_AGENT_NAME.to_string(),
                model: self.decision.model().to_string(),
                purpose: "Route query".to_string(),
            },
            LlmCall {
                agent: executed.display_name().to_string(),
                model: self.model_for(executed).to_string(),
                purpose: executed.purpose().to_string(),
            },
        ];

        tracing::info!(
            session_id = %session_id,
            decision = %decision_label,
            agent = %reply.agent,
            "Handled chat request"
        );

        Ok(ChatResponse {
            session_id,
            agent: reply.agent,
            response: reply.response,
            sources: reply.sources,
            confidence: reply.confidence,
            knowledge_bases_used: reply.knowledge_bases_used,
            routing: RoutingInfo {
                decision: decision_label,
                executed_agent: executed.display_name().to_string(),
                rag_disabled,
                llm_calls,
            },
        })
    }

    async fn run_agent(
        &self,
        kind: AgentKind,
        query: &str,
        history: &[ChatTurn],
        knowledge_bases: Option<&[String]>,
    ) -> AgentReply {
        match kind {
            AgentKind::Rag => self.rag.query(query, history, knowledge_bases).await,
            AgentKind::WebSearch => self.web_search.search(query, history).await,
            AgentKind::Conversation => self.conversation.chat(query, history).await,
        }
    }

    fn model_for(&self, kind: AgentKind) -> &str {
        match kind {
            AgentKind::Rag => self.rag.model(),
            AgentKind::WebSearch => self.web_search.model(),
            AgentKind::Conversation => self.conversation.model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchResult;
    use crate::test_support::FakeSearch;
    use concierge_core::{AgentSettings, KnowledgeBaseSpec};
    use concierge_knowledge::embeddings::TrigramProvider;
    use concierge_knowledge::KnowledgeRegistry;
    use concierge_llm::MockClient;
    use concierge_prompt::{SettingsUpdate, UserSettings};

    const FACT: &str = "Metformin is the first-line medication for type 2 diabetes.";

    /// Decision prompts contain "Your decision:"; the first matching rule wins.
    fn llm(route: &str) -> Arc<MockClient> {
        Arc::new(
            MockClient::new()
                .when("Your decision:", route)
                .when("Reference material:", "From the knowledge base.")
                .when("Search results:", "From the web.")
                .otherwise("Just chatting."),
        )
    }

    async fn router(llm: Arc<MockClient>) -> ChatRouter {
        let agents = AgentSettings::default();
        let settings = Arc::new(SettingsStore::in_memory(UserSettings::default()));

        let knowledge = KnowledgeRegistry::in_memory(
            &[KnowledgeBaseSpec::new("medical", "medical_kb", "")],
            Arc::new(TrigramProvider::new(256)),
        )
        .unwrap();
        knowledge
            .add_documents(&[FACT.to_string()], None, None)
            .await
            .unwrap();

        let search = Arc::new(FakeSearch::returning(vec![SearchResult::new(
            "Diabetes news",
            "New guidance published.",
            "https://example.org/news",
        )]));

        ChatRouter::new(
            DecisionAgent::new(llm.clone(), "router-model", agents.decision, settings.clone()),
            ConversationAgent::new(llm.clone(), "chat-model", agents.conversation, settings.clone()),
            WebSearchAgent::new(llm.clone(), "chat-model", search, agents.web_search, settings.clone()),
            RagAgent::new(llm, "chat-model", Arc::new(knowledge), agents.rag, settings.clone()),
            Arc::new(SessionStore::new(20)),
            settings,
        )
    }

    #[tokio::test]
    async fn test_conversation_route_records_history() {
        let router = router(llm("CONVERSATION")).await;

        let response = router.handle(ChatRequest::new("hello")).await.unwrap();
        assert_eq!(response.agent, "Conversation Agent");
        assert_eq!(response.response, "Just chatting.");
        assert_eq!(response.routing.decision, "CONVERSATION");
        assert!(!response.routing.rag_disabled);
        assert_eq!(response.routing.llm_calls.len(), 2);
        assert_eq!(response.routing.llm_calls[0].model, "router-model");
        assert_eq!(response.routing.llm_calls[1].agent, "Conversation Agent");

        let history = router
            .sessions()
            .history(&response.session_id)
            .await
            .unwrap();
        assert_eq!(
            history,
            vec![ChatTurn::user("hello"), ChatTurn::assistant("Just chatting.")]
        );
    }

    #[tokio::test]
    async fn test_rag_route_uses_knowledge() {
        let router = router(llm("RAG")).await;

        let response = router.handle(ChatRequest::new(FACT)).await.unwrap();
        assert_eq!(response.agent, "RAG Agent");
        assert_eq!(response.response, "From the knowledge base.");
        assert_eq!(response.knowledge_bases_used, vec!["medical"]);
        assert!(response.confidence.unwrap() < 0.01);
        assert_eq!(response.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_rag_disabled_falls_back_to_conversation() {
        let llm = llm("RAG");
        let router = router(llm.clone()).await;
        router
            .settings()
            .update(SettingsUpdate {
                rag_enabled: Some(false),
                ..Default::default()
            })
            .unwrap();

        let response = router.handle(ChatRequest::new(FACT)).await.unwrap();
        assert_eq!(response.agent, "Conversation Agent");
        assert_eq!(response.routing.decision, "RAG (disabled) -> CONVERSATION");
        assert_eq!(response.routing.executed_agent, "Conversation Agent");
        assert!(response.routing.rag_disabled);
        assert!(response.confidence.is_none());
    }

    #[tokio::test]
    async fn test_web_search_route() {
        let router = router(llm("WEBSEARCH")).await;
        let response = router
            .handle(ChatRequest::new("latest diabetes guidance"))
            .await
            .unwrap();
        assert_eq!(response.agent, "Web Search Agent");
        assert_eq!(response.response, "From the web.");
        assert_eq!(response.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_history_ends_with_current_query() {
        let llm = llm("CONVERSATION");
        let router = router(llm.clone()).await;

        let first = router.handle(ChatRequest::new("what is metformin")).await.unwrap();
        router
            .handle(ChatRequest::new("second question").with_session(&first.session_id))
            .await
            .unwrap();

        let requests = llm.requests();
        // decision, conversation, decision, conversation
        assert_eq!(requests.len(), 4);
        assert!(requests[0]
            .prompt
            .contains("Conversation history:\nuser: what is metformin\n"));
        assert!(!requests[0].prompt.contains("Conversation history:\nNone"));
        assert!(requests[1]
            .prompt
            .contains("Conversation history:\nUser: what is metformin\n"));

        let second_decision = &requests[2].prompt;
        assert!(second_decision.contains(
            "user: what is metformin\nassistant: Just chatting.\nuser: second question\n"
        ));
    }

    #[tokio::test]
    async fn test_request_history_seeds_new_session() {
        let llm = llm("CONVERSATION");
        let router = router(llm.clone()).await;

        let mut request = ChatRequest::new("and the dose?").with_session("client-1");
        request.conversation_history = Some(vec![
            ChatTurn::user("what is metformin?"),
            ChatTurn::assistant("A diabetes drug."),
        ]);
        router.handle(request.clone()).await.unwrap();
        assert!(llm.requests()[0]
            .prompt
            .contains("user: what is metformin?\n"));

        // The session now has turns, so the request history is ignored.
        request.conversation_history = Some(vec![ChatTurn::user("ignored")]);
        router.handle(request).await.unwrap();
        let history = router.sessions().history("client-1").await.unwrap();
        assert_eq!(history.len(), 6);
        assert!(history.iter().all(|t| t.content != "ignored"));
    }

    #[tokio::test]
    async fn test_decision_failure_routes_to_conversation() {
        let llm = Arc::new(
            MockClient::new()
                .fail_when("Your decision:", "model offline")
                .otherwise("Still here."),
        );
        let router = router(llm).await;

        let response = router.handle(ChatRequest::new("hello")).await.unwrap();
        assert_eq!(response.agent, "Conversation Agent");
        assert_eq!(response.response, "Still here.");
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let router = router(llm("CONVERSATION")).await;
        assert!(router.handle(ChatRequest::new("   ")).await.is_err());
        assert_eq!(router.sessions().session_count().await, 0);
    }
}
