pub mod retrieve;

pub use bestmatch_core::*;
pub use bestmatch_rerank::{
    api_key_from_env, Backoff, ErrorKind, ExponentialJitter, FixedBackoff, ProviderError,
    RankedDocument, RerankClient, RerankClientConfig, RerankItem, RerankProvider, RerankRequest,
    RerankResponse, RerankingResult, RetryPolicy, VoyageRerankConfig, VoyageRerankProvider,
};
pub use retrieve::*;
