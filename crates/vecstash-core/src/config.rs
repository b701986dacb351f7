//! vecstash configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VecStashError};

/// Default eviction budget in megabytes.
pub const DEFAULT_MAX_SIZE_IN_MB: f64 = 2048.0;
/// Default debounce for flushes (reserved, not applied).
pub const DEFAULT_DEBOUNCE_TIME_MS: u64 = 0;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VecStashConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl VecStashConfig {
    /// Load config from the default path (~/.vecstash/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VecStashError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| VecStashError::Config(format!("Failed to parse config: {e}")))?;
        config.store.validate()?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| VecStashError::Serialization(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the vecstash home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vecstash")
    }
}

/// How flush failures are reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Log and swallow flush failures; in-memory state stays authoritative.
    #[default]
    BestEffort,
    /// Return flush failures to the caller as `VecStashError::Persistence`.
    Strict,
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_max_size_in_mb")]
    pub max_size_in_mb: f64,
    /// Accepted for compatibility; flushes are not debounced.
    #[serde(default = "default_debounce_time_ms")]
    pub debounce_time_ms: u64,
    #[serde(default)]
    pub durability: Durability,
}

fn default_max_size_in_mb() -> f64 { DEFAULT_MAX_SIZE_IN_MB }
fn default_debounce_time_ms() -> u64 { DEFAULT_DEBOUNCE_TIME_MS }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_size_in_mb: default_max_size_in_mb(),
            debounce_time_ms: default_debounce_time_ms(),
            durability: Durability::default(),
        }
    }
}

impl StoreConfig {
    /// Reject budgets that cannot be compared against a size.
    pub fn validate(&self) -> Result<()> {
        if !self.max_size_in_mb.is_finite() || self.max_size_in_mb < 0.0 {
            return Err(VecStashError::Config(format!(
                "max_size_in_mb must be a non-negative number, got {}",
                self.max_size_in_mb
            )));
        }
        Ok(())
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// `openai`, `ollama`, `tei` or `custom:<base url>`.
    #[serde(default = "default_embedder_provider")]
    pub provider: String,
    /// Empty = the provider's default model.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// Empty = registry default (or its env override).
    #[serde(default)]
    pub endpoint: String,
    /// Providers tried in order after the primary one fails.
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

fn default_embedder_provider() -> String { "openai".into() }

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: default_embedder_provider(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            fallbacks: Vec::new(),
        }
    }
}

/// Where documents are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `sqlite`, `json` or `memory`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_backend() -> String { "sqlite".into() }
fn default_storage_path() -> String { "~/.vecstash/documents.db".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    /// Storage path with `~` and env vars expanded.
    pub fn resolved_path(&self) -> PathBuf {
        let expanded = shellexpand::full(&self.path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| self.path.clone());
        PathBuf::from(expanded)
    }
}
