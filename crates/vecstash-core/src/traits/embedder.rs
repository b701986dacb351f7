//! Embedding provider capability.

use async_trait::async_trait;

use crate::error::Result;

/// Converts text into fixed-length vectors.
///
/// Implementations must return one vector per input text, in input order.
/// Retry and failover belong to the implementation, not to the store.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short identifier, e.g. `"openai:text-embedding-ada-002"`.
    fn name(&self) -> &str;

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Whether the provider is reachable and ready.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
