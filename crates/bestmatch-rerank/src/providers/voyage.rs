use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VoyageRerankConfig;
use crate::error::ProviderError;
use crate::traits::RerankProvider;
use crate::types::{RerankItem, RerankRequest, RerankResponse};

#[derive(Clone)]
pub struct VoyageRerankProvider {
    config: VoyageRerankConfig,
    client: Client,
}

impl VoyageRerankProvider {
    pub fn new(config: VoyageRerankConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait::async_trait]
impl RerankProvider for VoyageRerankProvider {
    fn name(&self) -> &'static str {
        "voyage"
    }

    async fn rerank(&self, request: RerankRequest) -> Result<RerankResponse, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::Authentication(
                "no API key provided; pass one explicitly or set VOYAGE_API_KEY".to_string(),
            )
        })?;
        request.validate()?;

        let payload = VoyageRerankPayload {
            query: &request.query,
            documents: &request.documents,
            model: &request.model,
            top_k: request.top_k,
            truncation: request.truncation,
            return_documents: false,
        };
        debug!(
            documents = request.documents.len(),
            model = %request.model,
            top_k = ?request.top_k,
            "voyage rerank request"
        );

        let res = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let body = res.bytes().await?;
        let parsed: VoyageRerankResponse = serde_json::from_slice(&body)?;
        let raw_items = if parsed.data.is_empty() {
            parsed.results
        } else {
            parsed.data
        };

        let items = raw_items
            .into_iter()
            .map(|it| RerankItem {
                index: it.index,
                relevance_score: it.relevance_score,
            })
            .collect();

        Ok(RerankResponse {
            provider: self.name().to_string(),
            model: parsed.model.unwrap_or(request.model),
            items,
            total_tokens: parsed.usage.map(|u| u.total_tokens),
        })
    }
}

#[derive(Debug, Serialize)]
struct VoyageRerankPayload<'a> {
    query: &'a str,
    documents: &'a [String],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<usize>,
    truncation: bool,
    return_documents: bool,
}

#[derive(Debug, Deserialize)]
struct VoyageRerankResponse {
    #[serde(default)]
    data: Vec<VoyageRerankItem>,
    #[serde(default)]
    results: Vec<VoyageRerankItem>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<VoyageUsage>,
}

#[derive(Debug, Deserialize)]
struct VoyageRerankItem {
    index: usize,
    #[serde(alias = "score")]
    relevance_score: f32,
}

#[derive(Debug, Deserialize)]
struct VoyageUsage {
    total_tokens: u64,
}
