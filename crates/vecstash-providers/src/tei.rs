//! Self-hosted HuggingFace text-embeddings-inference server.
//!
//! `POST {base}/embed {"inputs": [...], "normalize": true}` → `[[f32]]`.
//! The server hosts a single model; `model` is informational.

use async_trait::async_trait;
use serde_json::{Value, json};
use vecstash_core::config::EmbedderConfig;
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::Embedder;

use crate::endpoint::{Endpoint, parse_vector};
use crate::provider_registry::EmbedderDef;

pub struct TeiEmbedder {
    endpoint: Endpoint,
    label: String,
}

impl TeiEmbedder {
    pub fn from_registry(def: &EmbedderDef, config: &EmbedderConfig) -> Result<Self> {
        let endpoint = Endpoint::from_registry(def, config)?;
        let label = format!("tei:{}", endpoint.model);
        Ok(Self { endpoint, label })
    }
}

pub(crate) fn parse_response(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let rows = json
        .as_array()
        .ok_or_else(|| VecStashError::Provider("TEI response is not an array".into()))?;
    let vectors = rows
        .iter()
        .map(parse_vector)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| VecStashError::Provider("Malformed embedding in TEI response".into()))?;
    if vectors.len() != expected {
        return Err(VecStashError::Provider(format!(
            "Expected {expected} embeddings, got {}",
            vectors.len()
        )));
    }
    Ok(vectors)
}

#[async_trait]
impl Embedder for TeiEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_texts(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| VecStashError::Provider("Empty TEI response".into()))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "inputs": texts, "normalize": true });
        let json = self.endpoint.post_json(&self.endpoint.embed_path, &body).await?;
        parse_response(&json, texts.len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.endpoint.ping("/health").await)
    }
}
