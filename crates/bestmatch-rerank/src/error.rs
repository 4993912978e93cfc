use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("service unavailable: status={status}, body={body}")]
    ServiceUnavailable { status: u16, body: String },

    #[error("provider server error: status={status}, body={body}")]
    Server { status: u16, body: String },

    #[error("provider API error: status={status}, body={body}")]
    Api { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("http error: {0}")]
    Http(reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("provider returned invalid response: {0}")]
    InvalidResponse(String),
}

/// Coarse classification used by retry predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimit,
    ServiceUnavailable,
    Timeout,
    Authentication,
    InvalidRequest,
    Server,
    Connection,
    Other,
}

impl ErrorKind {
    pub const TRANSIENT: [Self; 3] = [Self::RateLimit, Self::ServiceUnavailable, Self::Timeout];

    pub fn is_transient(self) -> bool {
        Self::TRANSIENT.contains(&self)
    }
}

impl ProviderError {
    /// Maps a non-success HTTP status to the matching error class.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 | 404 | 422 => Self::InvalidRequest(format!("status={status}, body={body}")),
            401 | 403 => Self::Authentication(format!("status={status}, body={body}")),
            429 => Self::RateLimited(body),
            500 => Self::Server { status, body },
            502..=504 => Self::ServiceUnavailable { status, body },
            _ => Self::Api { status, body },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited(_) => ErrorKind::RateLimit,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::Timeout => ErrorKind::Timeout,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Server { .. } => ErrorKind::Server,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Config(_)
            | Self::Api { .. }
            | Self::Http(_)
            | Self::Serde(_)
            | Self::InvalidResponse(_) => ErrorKind::Other,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}
