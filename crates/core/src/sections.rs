//! Tunable sections of the service configuration.
//!
//! Every struct here is `#[serde(default)]` so a YAML file only needs to
//! name the keys it changes.

use serde::{Deserialize, Serialize};

/// Sampling and history settings for each agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentSettings {
    pub decision: DecisionSettings,
    pub conversation: ConversationSettings,
    pub web_search: WebSearchSettings,
    pub rag: RagSettings,
}

/// Intent classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionSettings {
    pub temperature: f32,
    pub top_p: f32,
    /// Prior turns shown to the classifier.
    pub history_window: usize,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.8,
            history_window: 4,
        }
    }
}

/// Plain chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationSettings {
    pub temperature: f32,
    pub top_p: f32,
    /// Prior turns included in the conversation prompt.
    pub context_limit: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            context_limit: 20,
        }
    }
}

/// Web search responder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebSearchSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub max_results: usize,
    /// Prepended to every search query when non-empty (e.g. a topic hint).
    pub query_prefix: String,
    pub history_window: usize,
    pub snippet_chars: usize,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.8,
            max_results: 5,
            query_prefix: String::new(),
            history_window: 4,
            snippet_chars: 200,
        }
    }
}

/// Retrieval-augmented responder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagSettings {
    pub temperature: f32,
    pub top_p: f32,
    /// Nearest passages fetched from each collection.
    pub top_k: usize,
    /// Largest cosine distance the best passage may have. Above it the
    /// retrieval counts as low confidence.
    pub min_retrieval_confidence: f32,
    /// Passages kept for the prompt context after merging.
    pub context_top_n: usize,
    pub include_sources: bool,
    pub history_window: usize,
    pub snippet_chars: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.8,
            top_k: 5,
            min_retrieval_confidence: 0.40,
            context_top_n: 3,
            include_sources: true,
            history_window: 4,
            snippet_chars: 200,
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

/// In-memory session store limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Turns kept per session; older turns are dropped first.
    pub max_history: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { max_history: 20 }
    }
}

/// A named knowledge base backed by one vector collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBaseSpec {
    pub name: String,
    pub collection: String,
    #[serde(default)]
    pub description: String,
}

impl KnowledgeBaseSpec {
    pub fn new(
        name: impl Into<String>,
        collection: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            description: description.into(),
        }
    }
}

pub fn default_knowledge_bases() -> Vec<KnowledgeBaseSpec> {
    vec![KnowledgeBaseSpec::new(
        "general",
        "general_knowledge",
        "General reference documents",
    )]
}

/// Embedding backend used for ingestion and queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// "trigram", "ollama" or "openai"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
    /// Environment variable holding the API key (openai only).
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key_env: None,
        }
    }
}

/// Web search backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// "duckduckgo" or "searxng"
    pub provider: String,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            endpoint: None,
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_defaults() {
        let rag = RagSettings::default();
        assert_eq!(rag.top_k, 5);
        assert_eq!(rag.context_top_n, 3);
        assert!((rag.min_retrieval_confidence - 0.40).abs() < f32::EPSILON);
        assert!(rag.include_sources);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "rag:\n  top_k: 8\nconversation:\n  context_limit: 6\n";
        let settings: AgentSettings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.rag.top_k, 8);
        assert_eq!(settings.rag.context_top_n, 3);
        assert_eq!(settings.conversation.context_limit, 6);
        assert_eq!(settings.decision, DecisionSettings::default());
    }
}
