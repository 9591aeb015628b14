//! Types shared by the agents and the dispatcher.

use concierge_prompt::ChatTurn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three responders a query can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentKind {
    Rag,
    WebSearch,
    Conversation,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Rag, AgentKind::WebSearch, AgentKind::Conversation];

    /// Label the decision model answers with.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rag => "RAG",
            Self::WebSearch => "WEBSEARCH",
            Self::Conversation => "CONVERSATION",
        }
    }

    /// Name reported in replies.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Rag => "RAG Agent",
            Self::WebSearch => "Web Search Agent",
            Self::Conversation => "Conversation Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Rag => "Answers from the knowledge bases",
            Self::WebSearch => "Searches the web for current information",
            Self::Conversation => "General conversation and simple questions",
        }
    }

    /// What the agent's model call is for, as reported in routing info.
    pub fn purpose(&self) -> &'static str {
        match self {
            Self::Rag => "Answer from retrieved passages",
            Self::WebSearch => "Summarize search results",
            Self::Conversation => "Generate conversation reply",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A passage cited by the RAG agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSourceRef {
    /// Truncated passage text.
    pub content: String,
    /// Cosine distance to the query.
    pub score: f32,
    pub metadata: serde_json::Value,
    pub knowledge_base: String,
}

/// A search result cited by the web search agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSourceRef {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Knowledge(KnowledgeSourceRef),
    Web(WebSourceRef),
}

/// What an agent returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    /// Display name of the agent that answered.
    pub agent: String,
    pub response: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Best retrieval distance (RAG only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge_bases_used: Vec<String>,
}

impl AgentReply {
    pub fn new(kind: AgentKind, response: impl Into<String>) -> Self {
        Self {
            agent: kind.display_name().to_string(),
            response: response.into(),
            sources: Vec::new(),
            confidence: None,
            knowledge_bases_used: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_knowledge_bases(mut self, knowledge_bases: Vec<String>) -> Self {
        self.knowledge_bases_used = knowledge_bases;
        self
    }
}

/// Incoming chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Prior turns, used only to seed a session that has none.
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatTurn>>,
    /// Restrict RAG to these knowledge bases.
    #[serde(default)]
    pub knowledge_bases: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// One model call made while answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmCall {
    pub agent: String,
    pub model: String,
    pub purpose: String,
}

/// How a request was routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingInfo {
    /// Decision label, or `"RAG (disabled) -> CONVERSATION"`.
    pub decision: String,
    pub executed_agent: String,
    pub rag_disabled: bool,
    pub llm_calls: Vec<LlmCall>,
}

/// Response to a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub agent: String,
    pub response: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge_bases_used: Vec<String>,
    pub routing: RoutingInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_label() {
        for kind in AgentKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.label());
        }
    }

    #[test]
    fn test_sources_serialize_untagged() {
        let web = Source::Web(WebSourceRef {
            title: "WHO".to_string(),
            snippet: "Hypertension...".to_string(),
            url: "https://who.int".to_string(),
        });
        let json = serde_json::to_value(&web).unwrap();
        assert_eq!(json["url"], "https://who.int");
        assert!(json.get("Web").is_none());

        let parsed: Source = serde_json::from_value(serde_json::json!({
            "content": "Aspirin...",
            "score": 0.12,
            "metadata": {"source": "a.txt"},
            "knowledge_base": "drugs"
        }))
        .unwrap();
        assert!(matches!(parsed, Source::Knowledge(_)));
    }

    #[test]
    fn test_reply_omits_empty_optionals() {
        let reply = AgentReply::new(AgentKind::Conversation, "hi");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["agent"], "Conversation Agent");
        assert!(json.get("confidence").is_none());
        assert!(json.get("knowledge_bases_used").is_none());
        assert_eq!(json["sources"], serde_json::json!([]));
    }

    #[test]
    fn test_chat_request_minimal_body() {
        let req: ChatRequest = serde_json::from_str(r#"{"query": "hello"}"#).unwrap();
        assert_eq!(req.query, "hello");
        assert!(req.session_id.is_none());
        assert!(req.conversation_history.is_none());
    }
}
