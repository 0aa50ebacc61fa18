use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("completion returned no choices")]
    EmptyReply,

    #[error("no JSON object boundaries in reply")]
    MissingBoundary,

    #[error("invalid JSON in reply: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing API key: set {0}")]
    MissingApiKey(String),
}

pub type Result<T> = std::result::Result<T, AiError>;
