//! Agents for Concierge.
//!
//! A decision agent classifies each query, then one of three responders
//! answers it:
//!
//! - **RAG**: retrieval from the knowledge bases with a confidence cutoff
//! - **Web search**: answers from live search results
//! - **Conversation**: plain chat
//!
//! [`ChatRouter`] ties them to the per-session history.

pub mod conversation;
pub mod decision;
pub mod dispatcher;
pub mod rag;
pub mod search;
pub mod session;
pub mod types;
pub mod web_search;

#[cfg(test)]
mod test_support;

pub use conversation::ConversationAgent;
pub use decision::{classify, DecisionAgent};
pub use dispatcher::ChatRouter;
pub use rag::RagAgent;
pub use search::{create_search_client, SearchClient, SearchResult};
pub use session::SessionStore;
pub use types::{
    AgentKind, AgentReply, ChatRequest, ChatResponse, KnowledgeSourceRef, LlmCall, RoutingInfo,
    Source, WebSourceRef,
};
pub use web_search::WebSearchAgent;
