pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::NicheSignalError;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Embedding seam for the clustering engine. Implemented by the production
/// Voyage-backed embedder and by deterministic test embedders.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}
