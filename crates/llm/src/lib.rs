//! LLM integration crate for Concierge.
//!
//! Provider-agnostic completion interface used by every agent.
//!
//! # Providers
//! - **Ollama**: local runtime (default)
//! - **OpenAI-compatible**: OpenAI, DashScope compatible mode, vLLM and friends
//! - **Mock**: canned replies for offline runs and tests
//!
//! # Example
//! ```no_run
//! use concierge_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2").with_temperature(0.7);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockClient, OllamaClient, OpenAiCompatibleClient};
pub use types::ProviderType;
