//! Service configuration.
//!
//! Loaded from a YAML file (path overridable via `CHAT_RECALL_CONFIG_PATH`),
//! with secrets overridable through environment variables so API keys never
//! have to live on disk.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::AiError;

const CONFIG_PATH_ENV: &str = "CHAT_RECALL_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URL of the vector index REST endpoint.
    pub endpoint: String,
    pub api_key: String,
    pub namespace: String,
    /// Vector dimension; must match the embedding model.
    pub dimension: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:6333".to_string(),
            api_key: String::new(),
            namespace: "chat-messages".to_string(),
            dimension: 1536,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// One of "google", "brave", "bing". Anything else falls back to
    /// DuckDuckGo, which needs no key.
    pub provider: String,
    pub google_api_key: String,
    pub google_engine_id: String,
    pub brave_api_key: String,
    pub bing_api_key: String,
    pub max_results: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            google_api_key: String::new(),
            google_engine_id: String::new(),
            brave_api_key: String::new(),
            bing_api_key: String::new(),
            max_results: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Sliding time-to-live for conversation transcripts, in hours.
    pub ttl_hours: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
}

impl AiConfig {
    /// Load configuration from the default location, falling back to
    /// built-in defaults when no file exists.
    pub fn load() -> Result<Self, AiError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, AiError> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| AiError::Config(format!("failed to read {}: {}", path.display(), e)))?;
            serde_yaml::from_str(&contents)
                .map_err(|e| AiError::Config(format!("failed to parse {}: {}", path.display(), e)))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("CHAT_RECALL_LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(key) = env::var("CHAT_RECALL_EMBEDDINGS_API_KEY") {
            self.embeddings.api_key = key;
        }
        if let Ok(key) = env::var("CHAT_RECALL_INDEX_API_KEY") {
            self.index.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), AiError> {
        if self.llm.base_url.trim().is_empty() {
            return Err(AiError::Config("llm.base_url must not be empty".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AiError::Config("llm.model must not be empty".to_string()));
        }
        if self.embeddings.base_url.trim().is_empty() {
            return Err(AiError::Config(
                "embeddings.base_url must not be empty".to_string(),
            ));
        }
        if self.index.endpoint.trim().is_empty() {
            return Err(AiError::Config("index.endpoint must not be empty".to_string()));
        }
        if self.index.dimension == 0 {
            return Err(AiError::Config("index.dimension must be non-zero".to_string()));
        }
        if self.memory.ttl_hours == 0 {
            return Err(AiError::Config("memory.ttl_hours must be non-zero".to_string()));
        }
        if self.web_search.max_results == 0 || self.web_search.max_results > 20 {
            return Err(AiError::Config(
                "web_search.max_results must be between 1 and 20".to_string(),
            ));
        }
        Ok(())
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_file_missing() {
        let config = AiConfig::load_from(Path::new("/nonexistent/config.yml")).expect("defaults");
        assert_eq!(config.memory.ttl_hours, 24);
        assert_eq!(config.index.dimension, 1536);
        assert_eq!(config.web_search.provider, "duckduckgo");
    }

    #[test]
    fn loads_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "llm:\n  model: local-model\nmemory:\n  ttl_hours: 48\n"
        )
        .expect("write");

        let config = AiConfig::load_from(file.path()).expect("load");
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.memory.ttl_hours, 48);
        // Untouched sections keep their defaults.
        assert_eq!(config.web_search.max_results, 5);
    }

    #[test]
    fn rejects_zero_dimension() {
        let mut config = AiConfig::default();
        config.index.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_blank_endpoint() {
        let mut config = AiConfig::default();
        config.index.endpoint = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_result_limit() {
        let mut config = AiConfig::default();
        config.web_search.max_results = 50;
        assert!(config.validate().is_err());
    }
}
