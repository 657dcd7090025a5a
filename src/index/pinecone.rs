use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{MetadataFilter, ScoredRecord, VectorIndex};
use crate::core::config::IndexConfig;
use crate::core::errors::AiError;

/// REST client for Pinecone-compatible vector index services.
///
/// The record text travels inside the metadata payload under a reserved
/// `text` key, the way these services expect it; `query` lifts it back out.
#[derive(Clone)]
pub struct PineconeIndex {
    endpoint: String,
    api_key: String,
    namespace: String,
    client: Client,
}

const TEXT_KEY: &str = "text";

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            namespace: config.namespace.clone(),
            client: Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, AiError> {
        let url = format!("{}{}", self.endpoint, path);
        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::provider("vector-index", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AiError::Provider {
                provider: "vector-index",
                message: format!("{} failed ({}): {}", path, status, text),
            });
        }

        res.json()
            .await
            .map_err(|e| AiError::provider("vector-index", e))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        text: &str,
        metadata: Value,
    ) -> Result<(), AiError> {
        let mut payload = metadata;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(TEXT_KEY.to_string(), json!(text));
        }

        self.post(
            "/vectors/upsert",
            json!({
                "vectors": [{ "id": id, "values": vector, "metadata": payload }],
                "namespace": self.namespace,
            }),
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, AiError> {
        let mut body = json!({
            "vector": vector,
            "topK": limit,
            "includeMetadata": true,
            "namespace": self.namespace,
        });
        if let Some(filter) = filter {
            body["filter"] = translate_filter(filter);
        }

        let payload = self.post("/query", body).await?;
        let matches = payload
            .get("matches")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::new();
        for item in matches {
            let id = item
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let score = item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let mut metadata = item.get("metadata").cloned().unwrap_or_else(|| json!({}));
            let text = metadata
                .get(TEXT_KEY)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if let Some(obj) = metadata.as_object_mut() {
                obj.remove(TEXT_KEY);
            }
            results.push(ScoredRecord {
                id,
                text,
                score,
                metadata,
            });
        }

        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<(), AiError> {
        self.post(
            "/vectors/delete",
            json!({ "ids": [id], "namespace": self.namespace }),
        )
        .await?;
        Ok(())
    }
}

fn translate_filter(filter: &MetadataFilter) -> Value {
    match filter {
        MetadataFilter::And(clauses) => {
            json!({ "$and": clauses.iter().map(translate_filter).collect::<Vec<_>>() })
        }
        MetadataFilter::Or(clauses) => {
            json!({ "$or": clauses.iter().map(translate_filter).collect::<Vec<_>>() })
        }
        MetadataFilter::Eq(field, value) => json!({ (*field): { "$eq": value } }),
        MetadataFilter::Range { field, from, to } => {
            json!({ (*field): { "$gte": from, "$lte": to } })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_nested_filters() {
        let filter = MetadataFilter::And(vec![
            MetadataFilter::Eq("conversation_type", "private".to_string()),
            MetadataFilter::Or(vec![
                MetadataFilter::Eq("sender_id", "u1".to_string()),
                MetadataFilter::Eq("receiver_id", "u1".to_string()),
            ]),
        ]);

        let wire = translate_filter(&filter);
        assert_eq!(
            wire["$and"][0]["conversation_type"]["$eq"],
            "private"
        );
        assert_eq!(wire["$and"][1]["$or"][1]["receiver_id"]["$eq"], "u1");
    }

    #[test]
    fn translates_range_to_gte_lte() {
        let filter = MetadataFilter::Range {
            field: "timestamp",
            from: "2024-05-01T00:00:00Z".to_string(),
            to: "2024-05-02T00:00:00Z".to_string(),
        };
        let wire = translate_filter(&filter);
        assert_eq!(wire["timestamp"]["$gte"], "2024-05-01T00:00:00Z");
        assert_eq!(wire["timestamp"]["$lte"], "2024-05-02T00:00:00Z");
    }
}
