//! Shared HTTP plumbing: endpoint resolution, auth, JSON POST.

use serde_json::Value;
use vecstash_core::config::EmbedderConfig;
use vecstash_core::error::{Result, VecStashError};

use crate::provider_registry::{AuthStyle, EmbedderDef};

/// A resolved embeddings endpoint.
pub struct Endpoint {
    /// Provider name (e.g., "openai", "ollama", "custom").
    pub name: String,
    pub base_url: String,
    pub embed_path: String,
    pub model: String,
    api_key: String,
    auth_style: AuthStyle,
    client: reqwest::Client,
}

impl Endpoint {
    /// Resolve a registry entry against the user config.
    ///
    /// Resolution order:
    /// - API key: `config.api_key` > env vars > empty (error if the provider needs one)
    /// - Base URL: `config.endpoint` > env override > registry default
    /// - Model: `config.model` > registry default
    pub fn from_registry(def: &EmbedderDef, config: &EmbedderConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            def.env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };
        if def.auth_style == AuthStyle::Bearer && api_key.is_empty() {
            return Err(VecStashError::ApiKeyMissing(def.name.into()));
        }

        let base_url = if !config.endpoint.is_empty() {
            config.endpoint.trim_end_matches('/').to_string()
        } else {
            def.base_url_env
                .and_then(|env_key| std::env::var(env_key).ok())
                .map(|val| normalize_base_url(&val, def.base_url.ends_with("/v1")))
                .unwrap_or_else(|| def.base_url.to_string())
        };

        let model = if config.model.is_empty() {
            def.default_model.to_string()
        } else {
            config.model.clone()
        };

        Ok(Self {
            name: def.name.to_string(),
            base_url,
            embed_path: def.embed_path.to_string(),
            model,
            api_key,
            auth_style: def.auth_style,
            client: reqwest::Client::new(),
        })
    }

    /// OpenAI-compatible custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(target: &str, config: &EmbedderConfig) -> Result<Self> {
        let base_url = target
            .strip_prefix("custom:")
            .unwrap_or(target)
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(VecStashError::Config("custom embedder needs a base URL".into()));
        }

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };
        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };
        let model = if config.model.is_empty() {
            "default".to_string()
        } else {
            config.model.clone()
        };

        Ok(Self {
            name: "custom".to_string(),
            base_url,
            embed_path: "/embeddings".to_string(),
            model,
            api_key,
            auth_style,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }

    /// POST a JSON body to `path` and return the decoded JSON response.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        let resp = self.apply_auth(req).send().await.map_err(|e| {
            VecStashError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(VecStashError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        resp.json()
            .await
            .map_err(|e| VecStashError::Http(e.to_string()))
    }

    /// GET `path`; `None` when the server is unreachable or answers non-2xx.
    pub async fn get_json(&self, path: &str) -> Option<Value> {
        let req = self.apply_auth(self.client.get(self.url(path)));
        match req.send().await {
            Ok(r) if r.status().is_success() => r.json().await.ok(),
            _ => None,
        }
    }

    /// Whether the server answers 2xx at `path`.
    pub async fn ping(&self, path: &str) -> bool {
        let req = self.apply_auth(self.client.get(self.url(path)));
        matches!(req.send().await, Ok(r) if r.status().is_success())
    }
}

/// Accept `host:port` or a full URL from an env override.
fn normalize_base_url(val: &str, wants_v1: bool) -> String {
    let mut url = val.trim_end_matches('/').to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("http://{url}");
    }
    if wants_v1 && !url.ends_with("/v1") {
        url.push_str("/v1");
    }
    url
}

/// Decode a JSON array of numbers into an embedding.
pub fn parse_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}
