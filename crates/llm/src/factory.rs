//! LLM provider factory.

use crate::client::LlmClient;
use crate::providers::openai_compatible::{DASHSCOPE_BASE_URL, OPENAI_BASE_URL};
use crate::providers::{MockClient, OllamaClient, OpenAiCompatibleClient};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "dashscope", "mock")
/// * `endpoint` - Optional custom base URL
/// * `api_key` - API key for hosted providers
///
/// # Errors
/// Returns an error message if the provider is unknown, a required key is
/// missing, or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    if provider_type.requires_api_key() && api_key.is_none() {
        return Err(format!(
            "{} provider requires API key",
            provider_type.as_str()
        ));
    }

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::OpenAI | ProviderType::DashScope => {
            let default_url = if provider_type == ProviderType::OpenAI {
                OPENAI_BASE_URL
            } else {
                DASHSCOPE_BASE_URL
            };
            let client = OpenAiCompatibleClient::new(
                provider_type.as_str(),
                endpoint.unwrap_or(default_url),
                api_key.map(str::to_string),
            )
            .map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        ProviderType::Mock => Ok(Arc::new(
            MockClient::new().otherwise("This is a canned reply from the mock provider."),
        )),
    }
}
