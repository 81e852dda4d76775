use thiserror::Error;

#[derive(Error, Debug)]
pub enum NicheSignalError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Trend validation error: {0}")]
    Trend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
