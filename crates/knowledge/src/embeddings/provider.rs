//! Embedding provider trait and factory.

use super::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use concierge_core::{AppError, AppResult, EmbeddingSettings};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from settings.
///
/// `api_key` is only used by the `openai` provider; when absent the
/// variable named by `api_key_env` is consulted.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(settings.dimensions))),

        "ollama" => {
            let provider = OllamaProvider::new(
                &settings.model,
                settings.dimensions,
                settings.endpoint.as_deref(),
            )?;
            Ok(Arc::new(provider))
        }

        "openai" => {
            let key = api_key.map(str::to_string).or_else(|| {
                settings
                    .api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
            });
            let key = key.ok_or_else(|| {
                AppError::Config(
                    "The openai embedding provider needs an API key (set embedding.api_key_env)"
                        .to_string(),
                )
            })?;

            let provider = OpenAiProvider::new(
                &settings.model,
                settings.dimensions,
                settings.endpoint.as_deref(),
                key,
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Knowledge(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_trigram_provider() {
        let provider = create_provider(&settings("trigram"), None).unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_provider_is_lazy() {
        let mut s = settings("ollama");
        s.model = "nomic-embed-text".to_string();
        s.dimensions = 768;

        let provider = create_provider(&s, None).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_create_openai_requires_key() {
        let mut s = settings("openai");
        s.api_key_env = Some("CONCIERGE_TEST_UNSET_EMBEDDING_KEY".to_string());
        assert!(create_provider(&s, None).is_err());

        let provider = create_provider(&s, Some("sk-test")).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_create_unknown_provider() {
        let err = create_provider(&settings("gguf"), None).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingSettings::default(), None).unwrap();

        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
