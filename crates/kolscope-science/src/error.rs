use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] kolscope_core::CoreError),

    #[error("AI error: {0}")]
    Ai(#[from] kolscope_ai::AiError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScienceError>;
