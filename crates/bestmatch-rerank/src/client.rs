use std::sync::Arc;

use tracing::debug;

use crate::config::RerankClientConfig;
use crate::error::ProviderError;
use crate::providers::VoyageRerankProvider;
use crate::retry::RetryPolicy;
use crate::traits::RerankProvider;
use crate::types::{RerankRequest, RerankingResult};

/// Rerank client: one provider plus the retry policy wrapped around it.
///
/// Configuration is fixed at construction. Cloning is cheap and clones
/// share the underlying HTTP client.
#[derive(Clone)]
pub struct RerankClient {
    provider: Arc<dyn RerankProvider>,
    retry: RetryPolicy<ProviderError>,
}

impl RerankClient {
    /// Builds a Voyage-backed client. Credentials are not checked here.
    pub fn new(config: RerankClientConfig) -> Result<Self, ProviderError> {
        let provider = VoyageRerankProvider::new(config.provider)?;
        let retry = RetryPolicy::transient(config.max_retries).with_backoff(config.backoff);
        Ok(Self::with_provider(Arc::new(provider), retry))
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(RerankClientConfig::from_env()?)
    }

    pub fn with_provider(
        provider: Arc<dyn RerankProvider>,
        retry: RetryPolicy<ProviderError>,
    ) -> Self {
        Self { provider, retry }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn retry_policy(&self) -> &RetryPolicy<ProviderError> {
        &self.retry
    }

    /// Reranks `documents` against `query` with `model`.
    ///
    /// `top_k` caps the number of returned results (`None` returns all);
    /// `truncation` lets the service cut overlong inputs instead of failing.
    /// Transient failures are retried per the client's policy; anything
    /// else, and the last transient error once the budget is spent, is
    /// returned unchanged.
    pub async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        model: &str,
        top_k: Option<usize>,
        truncation: bool,
    ) -> Result<RerankingResult, ProviderError> {
        let request = RerankRequest::new(query, documents.to_vec(), model)
            .with_top_k(top_k)
            .with_truncation(truncation);
        request.validate()?;

        debug!(
            provider = self.provider.name(),
            documents = documents.len(),
            model,
            "rerank"
        );
        let response = self
            .retry
            .execute(|| self.provider.rerank(request.clone()))
            .await?;

        RerankingResult::from_response(request.documents, response)
    }
}
