//! Provider identification.

/// Supported chat providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
    OpenAI,
    /// Alibaba DashScope through its OpenAI-compatible endpoint.
    DashScope,
    /// Canned replies, no network.
    Mock,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAI),
            "dashscope" | "qwen" => Some(Self::DashScope),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
            Self::DashScope => "dashscope",
            Self::Mock => "mock",
        }
    }

    /// Whether the hosted API rejects anonymous requests.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::DashScope)
    }
}
