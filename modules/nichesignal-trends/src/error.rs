use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider rate limit hit (429)")]
    RateLimited,

    #[error("All API keys exhausted for this month")]
    QuotaExhausted,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TrendError {
    fn from(err: reqwest::Error) -> Self {
        TrendError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for TrendError {
    fn from(err: serde_json::Error) -> Self {
        TrendError::Parse(err.to_string())
    }
}
