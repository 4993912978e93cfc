use bestmatch_core::{CandidateId, Corpus, CorpusError, DocId};
use bestmatch_rerank::{ProviderError, RerankClient};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_RERANK_MODEL: &str = "rerank-2";

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Rerank(#[from] ProviderError),

    #[error("no candidate identifiers given")]
    NoCandidates,

    #[error("rerank returned no results")]
    EmptyRanking,

    #[error("top-ranked document not found in corpus: {document:?}")]
    NotInCorpus { document: String },
}

/// How the top-ranked document is mapped back to a corpus id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchResolution {
    /// Use the result's position in the candidate list.
    #[default]
    ByPosition,
    /// Scan the corpus for the first id whose text equals the result.
    ByText,
}

#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub model: String,
    pub truncation: bool,
    pub resolution: MatchResolution,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_RERANK_MODEL.to_string(),
            truncation: true,
            resolution: MatchResolution::default(),
        }
    }
}

/// Reranks the candidates' texts against `query` and returns the id of the
/// best match. Candidate lookup happens before any remote call.
///
/// The winner is resolved by position, so duplicate texts return the
/// candidate that was ranked. Use [`MatchResolution::ByText`] through
/// [`retrieve_best_match_with`] for the first-equal-text corpus scan.
pub async fn retrieve_best_match(
    client: &RerankClient,
    query: &str,
    candidates: &[CandidateId],
    corpus: &Corpus,
) -> Result<DocId, RetrieveError> {
    retrieve_best_match_with(client, query, candidates, corpus, &RetrieveOptions::default()).await
}

pub async fn retrieve_best_match_with(
    client: &RerankClient,
    query: &str,
    candidates: &[CandidateId],
    corpus: &Corpus,
    options: &RetrieveOptions,
) -> Result<DocId, RetrieveError> {
    if candidates.is_empty() {
        return Err(RetrieveError::NoCandidates);
    }
    let resolved = corpus.resolve(candidates)?;
    let texts: Vec<String> = resolved.iter().map(|c| c.text.to_string()).collect();

    let ranking = client
        .rerank(query, &texts, &options.model, Some(1), options.truncation)
        .await?;
    let top = ranking.top().ok_or(RetrieveError::EmptyRanking)?;
    debug!(
        index = top.index,
        score = f64::from(top.relevance_score),
        candidates = resolved.len(),
        "top rerank result"
    );

    match options.resolution {
        MatchResolution::ByPosition => resolved
            .get(top.index)
            .map(|c| c.id)
            .ok_or_else(|| RetrieveError::NotInCorpus {
                document: top.document.clone(),
            }),
        MatchResolution::ByText => corpus.find_by_text(&top.document).ok_or_else(|| {
            warn!("top-ranked text has no exact match in corpus");
            RetrieveError::NotInCorpus {
                document: top.document.clone(),
            }
        }),
    }
}
