//! Shared handler state and its construction from configuration.

use concierge_agents::{
    create_search_client, ChatRouter, ConversationAgent, DecisionAgent, RagAgent, SessionStore,
    WebSearchAgent,
};
use concierge_core::{AppConfig, AppError, AppResult};
use concierge_knowledge::{create_provider, KnowledgeRegistry};
use concierge_prompt::SettingsStore;
use std::sync::Arc;

/// Injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ChatRouter>,
    pub settings: Arc<SettingsStore>,
    pub knowledge: Arc<KnowledgeRegistry>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(router: ChatRouter) -> Self {
        let settings = router.settings().clone();
        let sessions = router.sessions().clone();
        let knowledge = router.rag().knowledge().clone();
        Self {
            router: Arc::new(router),
            settings,
            knowledge,
            sessions,
        }
    }

    /// Wire up the LLM client, knowledge bases, search backend and agents.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.ensure_data_dir()?;

        let llm = concierge_llm::create_client(
            &config.provider,
            config.endpoint_for(&config.provider).as_deref(),
            config.resolve_api_key(&config.provider).as_deref(),
        )
        .map_err(AppError::Config)?;

        let settings = Arc::new(SettingsStore::open(config.settings_path()));
        let knowledge = Arc::new(open_knowledge(config)?);
        let search = create_search_client(&config.search)?;
        let sessions = Arc::new(SessionStore::new(config.sessions.max_history));
        let agents = config.agents.clone();

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            knowledge_bases = knowledge.len(),
            search = %search.provider_name(),
            "Initialized agents"
        );

        let router = ChatRouter::new(
            DecisionAgent::new(llm.clone(), &config.model, agents.decision, settings.clone()),
            ConversationAgent::new(
                llm.clone(),
                &config.model,
                agents.conversation,
                settings.clone(),
            ),
            WebSearchAgent::new(
                llm.clone(),
                &config.model,
                search,
                agents.web_search,
                settings.clone(),
            ),
            RagAgent::new(llm, &config.model, knowledge, agents.rag, settings.clone()),
            sessions,
            settings,
        );

        Ok(Self::new(router))
    }
}

/// Open the configured knowledge bases under the data directory.
pub fn open_knowledge(config: &AppConfig) -> AppResult<KnowledgeRegistry> {
    let api_key = if config.embedding.provider == "openai" {
        config.resolve_api_key("openai")
    } else {
        None
    };
    let embedder = create_provider(&config.embedding, api_key.as_deref())?;

    let dir = config.knowledge_dir();
    std::fs::create_dir_all(&dir)?;

    let rag = &config.agents.rag;
    Ok(KnowledgeRegistry::open(&dir, &config.knowledge_bases, embedder)?
        .with_chunking(rag.chunk_size, rag.chunk_overlap))
}
