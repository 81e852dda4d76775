use anyhow::Result;
use async_trait::async_trait;

/// Text completion against a chat model.
///
/// Implementations apply their own timeout policy. The returned string is
/// always plain text — providers that interleave reasoning or tool blocks in
/// the response flatten them before returning (see `ChatResponse::plain_text`).
#[async_trait]
pub trait CompletionAgent: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Batch text embedding.
#[async_trait]
pub trait EmbedAgent: Send + Sync {
    async fn embed(&self, text: impl Into<String> + Send) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}
