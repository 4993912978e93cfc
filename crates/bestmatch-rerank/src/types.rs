use crate::error::ProviderError;

#[derive(Debug, Clone)]
pub struct RerankRequest {
    pub query: String,
    pub documents: Vec<String>,
    pub model: String,
    pub top_k: Option<usize>,
    pub truncation: bool,
}

impl RerankRequest {
    pub fn new(query: impl Into<String>, documents: Vec<String>, model: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            documents,
            model: model.into(),
            top_k: None,
            truncation: true,
        }
    }

    pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_truncation(mut self, truncation: bool) -> Self {
        self.truncation = truncation;
        self
    }

    /// Rejects requests the service would refuse anyway. A query of only
    /// whitespace counts as empty, which is stricter than a plain length
    /// check.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.query.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "rerank query is empty".to_string(),
            ));
        }
        if self.documents.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "rerank documents is empty".to_string(),
            ));
        }
        if let Some(pos) = self.documents.iter().position(String::is_empty) {
            return Err(ProviderError::InvalidRequest(format!(
                "rerank document at position {pos} is empty"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "rerank model is empty".to_string(),
            ));
        }
        if self.top_k == Some(0) {
            return Err(ProviderError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RerankItem {
    pub index: usize,
    pub relevance_score: f32,
}

#[derive(Debug, Clone)]
pub struct RerankResponse {
    pub provider: String,
    pub model: String,
    pub items: Vec<RerankItem>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub document: String,
    pub relevance_score: f32,
    pub index: usize,
}

/// Ranked results paired with the documents they were computed over.
#[derive(Debug, Clone)]
pub struct RerankingResult {
    pub provider: String,
    pub model: String,
    pub documents: Vec<String>,
    pub results: Vec<RankedDocument>,
    pub total_tokens: Option<u64>,
}

impl RerankingResult {
    /// Attaches document text to each item by position and orders the
    /// results by descending relevance.
    pub fn from_response(
        documents: Vec<String>,
        response: RerankResponse,
    ) -> Result<Self, ProviderError> {
        let mut results = response
            .items
            .into_iter()
            .map(|item| {
                let document = documents.get(item.index).cloned().ok_or_else(|| {
                    ProviderError::InvalidResponse(format!(
                        "result index {} out of range for {} documents",
                        item.index,
                        documents.len()
                    ))
                })?;
                Ok(RankedDocument {
                    document,
                    relevance_score: item.relevance_score,
                    index: item.index,
                })
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;
        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        Ok(Self {
            provider: response.provider,
            model: response.model,
            documents,
            results,
            total_tokens: response.total_tokens,
        })
    }

    pub fn top(&self) -> Option<&RankedDocument> {
        self.results.first()
    }
}
