//! Embedder registry — maps provider names to endpoint configurations.
//!
//! Providers are static entries; the wire protocol each one speaks is named
//! by its [`ApiStyle`].

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`, key required.
    Bearer,
    /// No authentication required (local servers).
    None,
}

/// Request/response format spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApiStyle {
    /// `POST /embeddings {model, input: [..]}` → `{data: [{index, embedding}]}`
    OpenAi,
    /// `POST /api/embeddings {model, prompt}` → `{embedding}`, one text per call
    Ollama,
    /// text-embeddings-inference: `POST /embed {inputs: [..]}` → `[[..]]`
    Tei,
}

/// Configuration for a single embedding provider.
#[derive(Debug, Clone)]
pub struct EmbedderDef {
    /// Provider identifier.
    pub name: &'static str,
    /// Base URL for the API.
    pub base_url: &'static str,
    /// Path of the embeddings endpoint (appended to base_url).
    pub embed_path: &'static str,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    pub auth_style: AuthStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
    /// Model used when the config leaves `model` empty.
    pub default_model: &'static str,
    pub api: ApiStyle,
}

// ─── Provider Definitions ────────────────────────────────────────────────────

static PROVIDERS: &[EmbedderDef] = &[
    EmbedderDef {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        embed_path: "/embeddings",
        env_keys: &["OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: Some("OPENAI_API_BASE"),
        default_model: "text-embedding-ada-002",
        api: ApiStyle::OpenAi,
    },
    EmbedderDef {
        name: "mistral",
        base_url: "https://api.mistral.ai/v1",
        embed_path: "/embeddings",
        env_keys: &["MISTRAL_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
        default_model: "mistral-embed",
        api: ApiStyle::OpenAi,
    },
    EmbedderDef {
        name: "ollama",
        base_url: "http://localhost:11434",
        embed_path: "/api/embeddings",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("OLLAMA_HOST"),
        default_model: "nomic-embed-text:latest",
        api: ApiStyle::Ollama,
    },
    EmbedderDef {
        name: "llamacpp",
        base_url: "http://localhost:8080/v1",
        embed_path: "/embeddings",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("LLAMACPP_HOST"),
        default_model: "default",
        api: ApiStyle::OpenAi,
    },
    EmbedderDef {
        name: "tei",
        base_url: "http://localhost:8080",
        embed_path: "/embed",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("TEI_URL"),
        default_model: "sentence-transformers/all-MiniLM-L6-v2",
        api: ApiStyle::Tei,
    },
];

/// Look up a provider by name or alias.
pub fn get_embedder_def(name: &str) -> Option<&'static EmbedderDef> {
    let lookup = match name {
        "llama.cpp" => "llamacpp",
        "huggingface" | "hf" | "text-embeddings-inference" => "tei",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// All registered provider names.
pub fn all_embedder_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
