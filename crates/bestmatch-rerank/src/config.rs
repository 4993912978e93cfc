use std::time::Duration;

use crate::error::ProviderError;
use crate::retry::ExponentialJitter;

pub const DEFAULT_API_BASE: &str = "https://api.voyageai.com/v1";

#[derive(Debug, Clone)]
pub struct VoyageRerankConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Option<Duration>,
}

impl VoyageRerankConfig {
    /// An explicit key wins; otherwise the key is looked up in the
    /// environment. A missing key is reported on the first request.
    pub fn new(api_key: Option<String>) -> Self {
        let base =
            std::env::var("VOYAGE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self {
            api_key: api_key.or_else(api_key_from_env),
            endpoint: rerank_endpoint(&base),
            timeout: None,
        }
    }
}

/// Reads `VOYAGE_API_KEY`, falling back to the file named by
/// `VOYAGE_API_KEY_PATH`.
pub fn api_key_from_env() -> Option<String> {
    std::env::var("VOYAGE_API_KEY")
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .or_else(|| {
            std::env::var("VOYAGE_API_KEY_PATH")
                .ok()
                .and_then(|path| std::fs::read_to_string(path).ok())
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
        })
}

pub fn rerank_endpoint(base: &str) -> String {
    format!("{}/rerank", base.trim_end_matches('/'))
}

#[derive(Debug, Clone)]
pub struct RerankClientConfig {
    pub provider: VoyageRerankConfig,
    /// Total attempt budget; 0 and 1 both mean a single attempt.
    pub max_retries: u32,
    pub backoff: ExponentialJitter,
}

impl RerankClientConfig {
    pub fn new(api_key: Option<String>, max_retries: u32, timeout: Option<Duration>) -> Self {
        let mut provider = VoyageRerankConfig::new(api_key);
        provider.timeout = timeout;
        Self {
            provider,
            max_retries,
            backoff: ExponentialJitter::default(),
        }
    }

    /// Builds a config from `BESTMATCH_MAX_RETRIES` and
    /// `BESTMATCH_TIMEOUT_SECS` on top of the credential lookup.
    pub fn from_env() -> Result<Self, ProviderError> {
        let max_retries = match std::env::var("BESTMATCH_MAX_RETRIES") {
            Ok(raw) => parse_max_retries(&raw)?,
            Err(_) => 0,
        };
        let timeout = match std::env::var("BESTMATCH_TIMEOUT_SECS") {
            Ok(raw) => Some(parse_timeout_secs(&raw)?),
            Err(_) => None,
        };
        Ok(Self::new(None, max_retries, timeout))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.provider.endpoint = endpoint.into();
        self
    }

    pub fn with_backoff(mut self, backoff: ExponentialJitter) -> Self {
        self.backoff = backoff;
        self
    }
}

fn parse_max_retries(raw: &str) -> Result<u32, ProviderError> {
    raw.trim().parse::<u32>().map_err(|_| {
        ProviderError::Config(format!(
            "BESTMATCH_MAX_RETRIES must be a non-negative integer, got {raw:?}"
        ))
    })
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| {
            ProviderError::Config(format!(
                "BESTMATCH_TIMEOUT_SECS must be a non-negative number of seconds, got {raw:?}"
            ))
        })
}
