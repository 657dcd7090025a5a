//! Text embedding provider seam.
//!
//! Empty or whitespace-only input yields `None` rather than a vector, so
//! callers can treat "nothing to embed" as a no-op instead of an error.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::EmbeddingsConfig;
use crate::core::errors::AiError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Embed a single text; `None` for empty/whitespace input.
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, AiError>;
}

/// Embedding client for any OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiEmbeddings {
    pub fn new(config: &EmbeddingsConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, AiError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": [text],
        });

        let mut req = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let res = req
            .send()
            .await
            .map_err(|e| AiError::provider("embeddings", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AiError::Provider {
                provider: "embeddings",
                message: format!("embedding request failed ({}): {}", status, text),
            });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| AiError::provider("embeddings", e))?;

        let vector: Vec<f32> = payload["data"][0]["embedding"]
            .as_array()
            .map(|vals| {
                vals.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect()
            })
            .unwrap_or_default();

        if vector.is_empty() {
            return Err(AiError::Provider {
                provider: "embeddings",
                message: "embedding response contained no vector".to_string(),
            });
        }

        Ok(Some(vector))
    }
}
