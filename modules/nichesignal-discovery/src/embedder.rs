use ai_client::traits::EmbedAgent;
use ai_client::OpenAi;
use anyhow::Result;

pub use nichesignal_common::TextEmbedder;

/// Voyage AI embeddings via the OpenAI-compatible API.
pub struct Embedder {
    client: OpenAi,
}

impl Embedder {
    pub fn new(voyage_api_key: &str) -> Self {
        let client = OpenAi::new(voyage_api_key)
            .with_base_url("https://api.voyageai.com/v1")
            .with_embedding_model("voyage-3-large");
        Self { client }
    }
}

#[async_trait::async_trait]
impl TextEmbedder for Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text.to_string()).await
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts).await
    }
}
