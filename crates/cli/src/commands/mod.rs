//! Command handlers for the Concierge CLI.

pub mod ask;
pub mod config;
pub mod knowledge;
pub mod serve;

pub use ask::AskCommand;
pub use config::ConfigCommand;
pub use knowledge::KnowledgeCommand;
pub use serve::ServeCommand;
