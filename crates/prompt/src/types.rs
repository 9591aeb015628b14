//! Prompt domain types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The four user-editable prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Decision,
    Conversation,
    Rag,
    WebSearch,
}

impl PromptKind {
    pub const ALL: [PromptKind; 4] = [
        PromptKind::Decision,
        PromptKind::Conversation,
        PromptKind::Rag,
        PromptKind::WebSearch,
    ];

    /// Settings key holding this prompt.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Decision => "agent_decision_prompt",
            Self::Conversation => "conversation_prompt",
            Self::Rag => "rag_prompt",
            Self::WebSearch => "websearch_prompt",
        }
    }

    /// Parse either the short type name (`rag`) or the full key (`rag_prompt`).
    pub fn parse(s: &str) -> Option<Self> {
        let short = s.strip_suffix("_prompt").unwrap_or(s);
        match short {
            "agent_decision" | "decision" => Some(Self::Decision),
            "conversation" => Some(Self::Conversation),
            "rag" => Some(Self::Rag),
            "websearch" | "web_search" => Some(Self::WebSearch),
            _ => None,
        }
    }

    /// Template variables this prompt is rendered with.
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            Self::Decision | Self::Conversation => &["query", "conversation_history"],
            Self::Rag => &["context", "conversation_history", "query"],
            Self::WebSearch => &["search_results", "conversation_history", "query"],
        }
    }
}
