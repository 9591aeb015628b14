//! Concierge core library.
//!
//! Shared foundations for every Concierge crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging setup
//! - Service configuration and its tunable sections

pub mod config;
pub mod error;
pub mod logging;
pub mod sections;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use sections::{
    AgentSettings, ConversationSettings, DecisionSettings, EmbeddingSettings, KnowledgeBaseSpec,
    RagSettings, SearchSettings, SessionSettings, WebSearchSettings,
};
