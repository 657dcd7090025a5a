use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{MetadataFilter, ScoredRecord, VectorIndex};
use crate::core::errors::AiError;

struct StoredRecord {
    id: String,
    vector: Vec<f32>,
    text: String,
    metadata: Value,
}

/// In-process vector index using brute-force cosine similarity.
///
/// Suitable for local development and tests; holds everything in memory.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: Mutex<Vec<StoredRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("index lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        text: &str,
        metadata: Value,
    ) -> Result<(), AiError> {
        let mut records = self.records.lock().expect("index lock");
        records.retain(|r| r.id != id);
        records.push(StoredRecord {
            id: id.to_string(),
            vector: vector.to_vec(),
            text: text.to_string(),
            metadata,
        });
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, AiError> {
        let records = self.records.lock().expect("index lock");
        let mut results: Vec<ScoredRecord> = records
            .iter()
            .filter(|r| filter.map(|f| f.matches(&r.metadata)).unwrap_or(true))
            .map(|r| ScoredRecord {
                id: r.id.clone(),
                text: r.text.clone(),
                score: cosine_similarity(vector, &r.vector),
                metadata: r.metadata.clone(),
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<(), AiError> {
        let mut records = self.records.lock().expect("index lock");
        records.retain(|r| r.id != id);
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn ranks_by_similarity() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert("a", &[1.0, 0.0], "close", json!({}))
            .await
            .unwrap();
        index
            .upsert("b", &[0.0, 1.0], "far", json!({}))
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.1], None, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert("a", &[1.0, 0.0], "old", json!({}))
            .await
            .unwrap();
        index
            .upsert("a", &[1.0, 0.0], "new", json!({}))
            .await
            .unwrap();

        assert_eq!(index.len(), 1);
        let results = index.query(&[1.0, 0.0], None, 10).await.unwrap();
        assert_eq!(results[0].text, "new");
    }

    #[tokio::test]
    async fn filter_restricts_results() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert("a", &[1.0, 0.0], "mine", json!({"sender_id": "u1"}))
            .await
            .unwrap();
        index
            .upsert("b", &[1.0, 0.0], "theirs", json!({"sender_id": "u2"}))
            .await
            .unwrap();

        let filter = MetadataFilter::Eq("sender_id", "u1".to_string());
        let results = index.query(&[1.0, 0.0], Some(&filter), 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert("a", &[1.0], "text", json!({}))
            .await
            .unwrap();
        index.delete("a").await.unwrap();
        assert!(index.is_empty());
    }
}
