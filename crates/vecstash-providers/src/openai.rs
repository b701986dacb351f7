//! OpenAI-compatible embeddings (OpenAI, Mistral, llama.cpp server, custom).
//!
//! One request per batch: `POST {base}/embeddings {model, input: [...]}`.
//! Results are reordered by each item's `index`.

use async_trait::async_trait;
use serde_json::{Value, json};
use vecstash_core::config::EmbedderConfig;
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::Embedder;

use crate::endpoint::{Endpoint, parse_vector};
use crate::provider_registry::EmbedderDef;

pub struct OpenAiEmbedder {
    endpoint: Endpoint,
    label: String,
}

impl OpenAiEmbedder {
    pub fn from_registry(def: &EmbedderDef, config: &EmbedderConfig) -> Result<Self> {
        Ok(Self::with_endpoint(Endpoint::from_registry(def, config)?))
    }

    pub fn custom(target: &str, config: &EmbedderConfig) -> Result<Self> {
        Ok(Self::with_endpoint(Endpoint::custom(target, config)?))
    }

    fn with_endpoint(endpoint: Endpoint) -> Self {
        let label = format!("{}:{}", endpoint.name, endpoint.model);
        Self { endpoint, label }
    }
}

pub(crate) fn build_request(model: &str, texts: &[String]) -> Value {
    json!({
        "model": model,
        "input": texts,
    })
}

/// Extract `data[].embedding`, ordered by `data[].index` when present.
pub(crate) fn parse_response(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| VecStashError::Provider("No data in embeddings response".into()))?;

    let mut indexed = data
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(pos);
            parse_vector(&item["embedding"])
                .map(|v| (index, v))
                .ok_or_else(|| VecStashError::Provider(format!("Malformed embedding at position {pos}")))
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(index, _)| *index);

    if indexed.len() != expected {
        return Err(VecStashError::Provider(format!(
            "Expected {expected} embeddings, got {}",
            indexed.len()
        )));
    }
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_texts(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| VecStashError::Provider("Empty embeddings response".into()))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = build_request(&self.endpoint.model, texts);
        let json = self.endpoint.post_json(&self.endpoint.embed_path, &body).await?;
        let vectors = parse_response(&json, texts.len())?;
        tracing::debug!("🔢 {} embedded {} texts", self.label, vectors.len());
        Ok(vectors)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.endpoint.ping("/models").await)
    }
}
