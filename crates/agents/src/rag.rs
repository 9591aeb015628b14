//! Retrieval-augmented answers from the knowledge bases.

use crate::types::{AgentKind, AgentReply, KnowledgeSourceRef, Source};
use crate::web_search::snippet;
use concierge_core::{AppResult, RagSettings};
use concierge_knowledge::{
    build_context, KnowledgeRegistry, RetrievalOutcome, RetrievalSettings, RetrievedPassage,
};
use concierge_llm::{LlmClient, LlmRequest};
use concierge_prompt::{format_labeled_history, render_prompt, ChatTurn, PromptKind, SettingsStore};
use std::collections::HashMap;
use std::sync::Arc;

pub const UNAVAILABLE_REPLY: &str = "The knowledge base is currently unavailable. It may not \
have been initialized yet. Please ask an administrator to add documents to it.";

pub const UNKNOWN_KNOWLEDGE_BASE_REPLY: &str = "The specified knowledge base does not exist.";

pub const LOW_CONFIDENCE_REPLY: &str = "Sorry, I could not find sufficiently reliable \
information in the knowledge base to answer your question. Try the web search instead.";

pub struct RagAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    knowledge: Arc<KnowledgeRegistry>,
    settings: RagSettings,
    prompts: Arc<SettingsStore>,
}

impl RagAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        knowledge: Arc<KnowledgeRegistry>,
        settings: RagSettings,
        prompts: Arc<SettingsStore>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            knowledge,
            settings,
            prompts,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeRegistry> {
        &self.knowledge
    }

    /// Answer `query` from the selected knowledge bases (all when `None`).
    ///
    /// `confidence` on the reply is the best passage's cosine distance, or
    /// 0 when nothing was answered from the knowledge bases.
    pub async fn query(
        &self,
        query: &str,
        history: &[ChatTurn],
        knowledge_bases: Option<&[String]>,
    ) -> AgentReply {
        match self.try_query(query, history, knowledge_bases).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("RAG query failed: {}", e);
                AgentReply::new(
                    AgentKind::Rag,
                    format!("Error while processing the query: {}", e),
                )
                .with_confidence(0.0)
            }
        }
    }

    async fn try_query(
        &self,
        query: &str,
        history: &[ChatTurn],
        knowledge_bases: Option<&[String]>,
    ) -> AppResult<AgentReply> {
        let retrieval = RetrievalSettings::from(&self.settings);
        let outcome = self
            .knowledge
            .retrieve(query, knowledge_bases, &retrieval)
            .await?;

        let (hits, best_distance, searched) = match outcome {
            RetrievalOutcome::NoCollections => {
                return Ok(AgentReply::new(AgentKind::Rag, UNAVAILABLE_REPLY).with_confidence(0.0));
            }
            RetrievalOutcome::NoMatchingCollections => {
                return Ok(AgentReply::new(AgentKind::Rag, UNKNOWN_KNOWLEDGE_BASE_REPLY)
                    .with_confidence(0.0));
            }
            RetrievalOutcome::LowConfidence { searched } => {
                return Ok(AgentReply::new(AgentKind::Rag, LOW_CONFIDENCE_REPLY)
                    .with_confidence(0.0)
                    .with_knowledge_bases(searched));
            }
            RetrievalOutcome::Found {
                hits,
                best_distance,
                searched,
            } => (hits, best_distance, searched),
        };

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("context".to_string(), build_context(&hits));
        vars.insert(
            "conversation_history".to_string(),
            format_labeled_history(history, self.settings.history_window),
        );

        let template = self.prompts.prompt(PromptKind::Rag);
        let prompt = render_prompt(&template, &vars)?;

        let request = LlmRequest::new(prompt, &self.model)
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p);
        let response = self.llm.complete(&request).await?;

        let sources = if self.settings.include_sources {
            hits.into_iter().map(|hit| self.to_source(hit)).collect()
        } else {
            Vec::new()
        };

        Ok(AgentReply::new(AgentKind::Rag, response.content)
            .with_sources(sources)
            .with_confidence(best_distance)
            .with_knowledge_bases(searched))
    }

    fn to_source(&self, hit: RetrievedPassage) -> Source {
        Source::Knowledge(KnowledgeSourceRef {
            content: snippet(&hit.text, self.settings.snippet_chars),
            score: hit.distance,
            metadata: hit.metadata,
            knowledge_base: hit.knowledge_base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::KnowledgeBaseSpec;
    use concierge_knowledge::embeddings::TrigramProvider;
    use concierge_llm::MockClient;
    use concierge_prompt::UserSettings;

    const ASPIRIN: &str = "Aspirin reduces the risk of heart attack by thinning the blood.";

    async fn registry(specs: &[KnowledgeBaseSpec]) -> Arc<KnowledgeRegistry> {
        let registry =
            KnowledgeRegistry::in_memory(specs, Arc::new(TrigramProvider::new(256))).unwrap();
        if !specs.is_empty() {
            registry
                .add_documents(&[ASPIRIN.to_string()], None, Some("drugs"))
                .await
                .unwrap();
        }
        Arc::new(registry)
    }

    fn specs() -> Vec<KnowledgeBaseSpec> {
        vec![
            KnowledgeBaseSpec::new("drugs", "drug_kb", "Drug leaflets"),
            KnowledgeBaseSpec::new("policy", "policy_kb", "Hospital policy"),
        ]
    }

    fn agent(llm: Arc<MockClient>, knowledge: Arc<KnowledgeRegistry>, settings: RagSettings) -> RagAgent {
        RagAgent::new(
            llm,
            "qwen-plus",
            knowledge,
            settings,
            Arc::new(SettingsStore::in_memory(UserSettings::default())),
        )
    }

    fn lenient() -> RagSettings {
        RagSettings {
            min_retrieval_confidence: 1.0,
            snippet_chars: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_found_answers_with_sources() {
        let llm = Arc::new(MockClient::new().otherwise("Aspirin thins the blood."));
        let rag = agent(llm.clone(), registry(&specs()).await, lenient());

        let history = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let reply = rag.query(ASPIRIN, &history, None).await;

        assert_eq!(reply.agent, "RAG Agent");
        assert_eq!(reply.response, "Aspirin thins the blood.");
        assert_eq!(reply.knowledge_bases_used, vec!["drugs", "policy"]);
        let confidence = reply.confidence.unwrap();
        assert!(confidence < 0.01, "confidence {}", confidence);

        assert_eq!(reply.sources.len(), 1);
        match &reply.sources[0] {
            Source::Knowledge(source) => {
                assert_eq!(source.content, "Aspirin re...");
                assert_eq!(source.knowledge_base, "drugs");
                assert_eq!(source.metadata["knowledge_base"], "drugs");
                assert!((source.score - confidence).abs() < f32::EPSILON);
            }
            other => panic!("expected a knowledge source, got {:?}", other),
        }

        let request = &llm.requests()[0];
        assert_eq!(request.temperature, Some(0.3));
        assert!(request.prompt.contains(ASPIRIN));
        assert!(request.prompt.contains("user: hi\nassistant: hello\n"));
    }

    #[tokio::test]
    async fn test_sources_can_be_disabled() {
        let llm = Arc::new(MockClient::new().otherwise("ok"));
        let settings = RagSettings {
            include_sources: false,
            ..lenient()
        };
        let reply = agent(llm, registry(&specs()).await, settings)
            .query(ASPIRIN, &[], None)
            .await;
        assert!(reply.sources.is_empty());
        assert!(reply.confidence.is_some());
    }

    #[tokio::test]
    async fn test_low_confidence_skips_the_model() {
        let llm = Arc::new(MockClient::new().otherwise("unused"));
        let strict = RagSettings {
            min_retrieval_confidence: 0.0001,
            ..Default::default()
        };
        let reply = agent(llm.clone(), registry(&specs()).await, strict)
            .query("How do I renew a passport?", &[], Some(&["drugs".to_string()][..]))
            .await;

        assert_eq!(reply.response, LOW_CONFIDENCE_REPLY);
        assert_eq!(reply.confidence, Some(0.0));
        assert_eq!(reply.knowledge_bases_used, vec!["drugs"]);
        assert!(reply.sources.is_empty());
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_selection() {
        let reply = agent(Arc::new(MockClient::new()), registry(&specs()).await, lenient())
            .query("q", &[], Some(&["nope".to_string()][..]))
            .await;
        assert_eq!(reply.response, UNKNOWN_KNOWLEDGE_BASE_REPLY);
        assert_eq!(reply.confidence, Some(0.0));
        assert!(reply.knowledge_bases_used.is_empty());
    }

    #[tokio::test]
    async fn test_no_collections() {
        let reply = agent(Arc::new(MockClient::new()), registry(&[]).await, lenient())
            .query("q", &[], None)
            .await;
        assert_eq!(reply.response, UNAVAILABLE_REPLY);
        assert_eq!(reply.confidence, Some(0.0));
    }

    #[tokio::test]
    async fn test_model_error_is_reported() {
        let llm = Arc::new(MockClient::new().failing("quota exceeded"));
        let reply = agent(llm, registry(&specs()).await, lenient())
            .query(ASPIRIN, &[], None)
            .await;
        assert!(reply
            .response
            .starts_with("Error while processing the query: "));
        assert!(reply.response.contains("quota exceeded"));
        assert_eq!(reply.confidence, Some(0.0));
        assert!(reply.knowledge_bases_used.is_empty());
    }
}
