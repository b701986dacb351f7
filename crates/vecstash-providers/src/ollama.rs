//! Ollama embeddings.
//!
//! Ollama's `/api/embeddings` takes one prompt per call, so a batch is sent
//! as concurrent requests and reassembled in input order.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Value, json};
use vecstash_core::config::EmbedderConfig;
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::Embedder;

use crate::endpoint::{Endpoint, parse_vector};
use crate::provider_registry::EmbedderDef;

pub struct OllamaEmbedder {
    endpoint: Endpoint,
    label: String,
}

impl OllamaEmbedder {
    pub fn from_registry(def: &EmbedderDef, config: &EmbedderConfig) -> Result<Self> {
        let endpoint = Endpoint::from_registry(def, config)?;
        let label = format!("ollama:{}", endpoint.model);
        Ok(Self { endpoint, label })
    }

    pub fn model(&self) -> &str {
        &self.endpoint.model
    }

    /// Whether `/api/tags` lists a model whose name starts with ours.
    pub async fn model_available(&self) -> bool {
        match self.endpoint.get_json("/api/tags").await {
            Some(tags) => tags_contain_model(&tags, &self.endpoint.model),
            None => false,
        }
    }
}

pub(crate) fn tags_contain_model(tags: &Value, model: &str) -> bool {
    tags["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m["name"].as_str())
                .any(|name| name.starts_with(model))
        })
        .unwrap_or(false)
}

pub(crate) fn parse_response(json: &Value) -> Result<Vec<f32>> {
    parse_vector(&json["embedding"])
        .ok_or_else(|| VecStashError::Provider("No embedding in Ollama response".into()))
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({ "model": self.endpoint.model, "prompt": text });
        let json = self.endpoint.post_json(&self.endpoint.embed_path, &body).await?;
        parse_response(&json)
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = try_join_all(texts.iter().map(|t| self.embed_text(t))).await?;
        tracing::debug!("🔢 {} embedded {} texts", self.label, vectors.len());
        Ok(vectors)
    }

    /// Server answers and the model has been pulled.
    async fn health_check(&self) -> Result<bool> {
        if !self.endpoint.ping("").await {
            tracing::warn!("⚠️ Ollama server is not running at {}", self.endpoint.base_url);
            return Ok(false);
        }
        if !self.model_available().await {
            tracing::warn!(
                "⚠️ Embedding model {} is not available, pull it first",
                self.endpoint.model
            );
            return Ok(false);
        }
        Ok(true)
    }
}
