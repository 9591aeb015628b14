//! Embedding generation for knowledge bases.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
