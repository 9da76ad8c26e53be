mod hash;
mod openai;
mod provider;

pub use hash::HashEmbeddingProvider;
pub use openai::OpenAIEmbeddingProvider;
pub use provider::EmbeddingProvider;

use crate::config::{self, EmbeddingConfig};
use crate::error::{EncoreError, Result};
use crate::retry::RetryPolicy;

enum EmbeddingInner {
    /// Remote OpenAI-compatible provider.
    OpenAI(OpenAIEmbeddingProvider),
    /// Local deterministic hash provider (no network).
    Hash(HashEmbeddingProvider),
}

/// Concrete embedding service that dispatches to the configured provider.
pub struct EmbeddingService {
    inner: EmbeddingInner,
    provider: &'static str,
    retry: RetryPolicy,
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("provider", &self.provider)
            .field("retry", &self.retry)
            .finish()
    }
}

impl EmbeddingService {
    /// Create an embedding service from configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = config::resolve_api_key(
                    config.api_key.as_deref(),
                    config.env_var.as_deref(),
                    "OPENAI_API_KEY",
                    "openai",
                    "embedding",
                )?;

                let model = if config.model == "hash-128d" {
                    "text-embedding-ada-002".to_string()
                } else {
                    config.model.clone()
                };

                Ok(Self {
                    inner: EmbeddingInner::OpenAI(OpenAIEmbeddingProvider::new(
                        api_key,
                        model,
                        config.base_url.clone(),
                        config.dimensions,
                    )),
                    provider: "openai",
                    retry: config.retry,
                })
            }

            "hash" => Ok(Self {
                inner: EmbeddingInner::Hash(HashEmbeddingProvider::new()),
                provider: "hash",
                retry: config.retry,
            }),

            other => Err(EncoreError::Config(format!(
                "unknown embedding provider: '{other}' (expected 'openai' or 'hash')"
            ))),
        }
    }

    /// Whether this provider makes remote API calls (and should use retry logic).
    fn is_remote(&self) -> bool {
        matches!(self.inner, EmbeddingInner::OpenAI(_))
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.inner {
            EmbeddingInner::OpenAI(p) => self.retry.run(|| p.embed(text)).await,
            EmbeddingInner::Hash(p) => p.embed(text).await,
        }
    }

    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match &self.inner {
            EmbeddingInner::OpenAI(p) => self.retry.run(|| p.embed_batch(texts)).await,
            EmbeddingInner::Hash(p) => p.embed_batch(texts).await,
        }
    }

    pub fn dimensions(&self) -> usize {
        match &self.inner {
            EmbeddingInner::OpenAI(p) => p.dimensions(),
            EmbeddingInner::Hash(p) => p.dimensions(),
        }
    }

    pub fn model_id(&self) -> &str {
        match &self.inner {
            EmbeddingInner::OpenAI(p) => p.model_id(),
            EmbeddingInner::Hash(p) => p.model_id(),
        }
    }

    /// Provider name for display purposes.
    pub fn provider_name(&self) -> &str {
        self.provider
    }

    /// True when remote requests should be retried on transient failure.
    /// Exposed for status display.
    pub fn is_networked(&self) -> bool {
        self.is_remote()
    }
}
