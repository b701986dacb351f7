//! # vecstash providers
//!
//! Embedding adapters for vecstash.
//!
//! OpenAI-style endpoints (OpenAI, Mistral, llama.cpp server, any `custom:`
//! URL) share `OpenAiEmbedder`. Ollama and text-embeddings-inference speak
//! their own wire formats. A non-empty `fallbacks` list wraps the chain in
//! a `FailoverEmbedder`.

pub mod endpoint;
pub mod failover;
pub mod ollama;
pub mod openai;
pub mod provider_registry;
pub mod tei;

use vecstash_core::config::{EmbedderConfig, VecStashConfig};
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::Embedder;

use provider_registry::ApiStyle;

/// Create the configured embedder.
pub fn create_embedder(config: &VecStashConfig) -> Result<Box<dyn Embedder>> {
    let primary = build_one(&config.embedder)?;
    if config.embedder.fallbacks.is_empty() {
        return Ok(primary);
    }

    let mut chain = vec![primary];
    for name in &config.embedder.fallbacks {
        // Fallbacks run on their registry defaults plus env keys.
        let fallback = EmbedderConfig {
            provider: name.clone(),
            ..Default::default()
        };
        chain.push(build_one(&fallback)?);
    }
    tracing::info!("🔗 Embedder failover chain: {} slots", chain.len());
    Ok(Box::new(failover::FailoverEmbedder::new(chain)?))
}

fn build_one(config: &EmbedderConfig) -> Result<Box<dyn Embedder>> {
    let name = config.provider.as_str();
    match name {
        // Custom endpoint: "custom:https://my-server.com/v1"
        other if other.starts_with("custom:") => {
            Ok(Box::new(openai::OpenAiEmbedder::custom(other, config)?))
        }
        _ => {
            let def = provider_registry::get_embedder_def(name)
                .ok_or_else(|| VecStashError::EmbedderNotFound(name.into()))?;
            Ok(match def.api {
                ApiStyle::OpenAi => Box::new(openai::OpenAiEmbedder::from_registry(def, config)?),
                ApiStyle::Ollama => Box::new(ollama::OllamaEmbedder::from_registry(def, config)?),
                ApiStyle::Tei => Box::new(tei::TeiEmbedder::from_registry(def, config)?),
            })
        }
    }
}

/// All embedder names accepted by `create_embedder`.
pub fn available_embedders() -> Vec<&'static str> {
    let mut names = provider_registry::all_embedder_names();
    names.push("custom");
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(provider: &str) -> VecStashConfig {
        let mut config = VecStashConfig::default();
        config.embedder.provider = provider.into();
        config
    }

    #[test]
    fn test_unknown_embedder() {
        let err = create_embedder(&config_for("word2vec")).err().unwrap();
        assert!(matches!(err, VecStashError::EmbedderNotFound(_)));
    }

    #[test]
    fn test_dispatch_by_api_style() {
        let mut config = config_for("ollama");
        config.embedder.endpoint = "http://localhost:11434".into();
        assert_eq!(create_embedder(&config).unwrap().name(), "ollama:nomic-embed-text:latest");

        let mut config = config_for("hf");
        config.embedder.endpoint = "http://localhost:8080".into();
        assert_eq!(
            create_embedder(&config).unwrap().name(),
            "tei:sentence-transformers/all-MiniLM-L6-v2"
        );

        let mut config = config_for("openai");
        config.embedder.api_key = "sk-test".into();
        assert_eq!(create_embedder(&config).unwrap().name(), "openai:text-embedding-ada-002");
    }

    #[test]
    fn test_custom_embedder() {
        let config = config_for("custom:http://localhost:9000/v1");
        assert_eq!(create_embedder(&config).unwrap().name(), "custom:default");
    }

    #[test]
    fn test_fallbacks_build_chain() {
        let mut config = config_for("ollama");
        config.embedder.fallbacks = vec!["tei".into()];
        let embedder = create_embedder(&config).unwrap();
        // Chain reports the primary's name.
        assert_eq!(embedder.name(), "ollama:nomic-embed-text:latest");

        config.embedder.fallbacks = vec!["nope".into()];
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn test_available_embedders() {
        let names = available_embedders();
        assert!(names.contains(&"openai"));
        assert!(names.contains(&"ollama"));
        assert!(names.contains(&"custom"));
    }
}
