//! Chat-history search.
//!
//! Turns a natural-language query into ranked matches from the vector
//! index, scoped to what the requesting user is allowed to see, and owns
//! message indexing and deletion.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::AiError;
use crate::embeddings::EmbeddingProvider;
use crate::index::{MetadataFilter, VectorIndex};

pub const PRIVATE: &str = "private";
pub const GROUP: &str = "group";

/// Metadata stored next to each indexed message vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub conversation_type: String,
    #[serde(default)]
    pub timestamp: String,
}

/// One ranked search hit. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MessageMatch {
    pub text: String,
    pub metadata: MessageMetadata,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct IndexMessageRequest {
    pub message_id: String,
    pub text: String,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub group_id: Option<String>,
    pub conversation_type: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub user_id: String,
    pub conversation_type: Option<String>,
    pub target_id: Option<String>,
    pub limit: usize,
    pub time_range: Option<TimeRange>,
}

/// Time window constraint, inclusive on both bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeRange {
    /// Midnight (UTC) to now.
    Today,
    /// Rolling 7 days.
    Week,
    /// Rolling 30 days.
    Month,
    /// Explicit ISO-8601 bounds.
    Custom { date_from: String, date_to: String },
}

impl TimeRange {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "today" => Some(TimeRange::Today),
            "week" => Some(TimeRange::Week),
            "month" => Some(TimeRange::Month),
            _ => None,
        }
    }

    pub fn bounds(&self) -> (String, String) {
        self.bounds_at(Utc::now())
    }

    fn bounds_at(&self, now: DateTime<Utc>) -> (String, String) {
        let fmt = |t: DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);
        match self {
            TimeRange::Today => {
                let midnight = now
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is valid")
                    .and_utc();
                (fmt(midnight), fmt(now))
            }
            TimeRange::Week => (fmt(now - Duration::days(7)), fmt(now)),
            TimeRange::Month => (fmt(now - Duration::days(30)), fmt(now)),
            TimeRange::Custom { date_from, date_to } => (date_from.clone(), date_to.clone()),
        }
    }
}

pub struct MessageSearch {
    embeddings: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl MessageSearch {
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embeddings, index }
    }

    /// Embed and upsert a message. Returns whether anything was written;
    /// empty/whitespace text is a no-op, never indexed.
    pub async fn index_message(&self, request: IndexMessageRequest) -> Result<bool, AiError> {
        if request.message_id.trim().is_empty() {
            return Err(AiError::InvalidRequest("message_id is required".to_string()));
        }
        if request.sender_id.trim().is_empty() {
            return Err(AiError::InvalidRequest("sender_id is required".to_string()));
        }
        if request.text.trim().is_empty() {
            return Ok(false);
        }

        let Some(vector) = self.embeddings.embed(&request.text).await? else {
            return Ok(false);
        };

        let metadata = MessageMetadata {
            message_id: request.message_id.clone(),
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            group_id: request.group_id,
            conversation_type: request
                .conversation_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| PRIVATE.to_string()),
            timestamp: request
                .timestamp
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        };
        let payload =
            serde_json::to_value(&metadata).map_err(|e| AiError::provider("vector-index", e))?;

        self.index
            .upsert(&request.message_id, &vector, &request.text, payload)
            .await?;
        tracing::debug!("indexed message {}", request.message_id);
        Ok(true)
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<(), AiError> {
        self.index.delete(message_id).await
    }

    /// Ranked matches for the query, ordered by descending score, length
    /// <= limit. Index failures propagate; only legitimately-empty results
    /// return an empty vec.
    pub async fn search(&self, query: SearchQuery) -> Result<Vec<MessageMatch>, AiError> {
        let Some(vector) = self.embeddings.embed(&query.query).await? else {
            return Ok(Vec::new());
        };

        let filter = build_filter(
            &query.user_id,
            query.conversation_type.as_deref(),
            query.target_id.as_deref(),
            query.time_range.as_ref(),
        );

        let records = self
            .index
            .query(&vector, Some(&filter), query.limit)
            .await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let metadata: MessageMetadata =
                    serde_json::from_value(record.metadata).unwrap_or_default();
                MessageMatch {
                    text: record.text,
                    metadata,
                    score: record.score,
                }
            })
            .collect())
    }
}

fn build_filter(
    user_id: &str,
    conversation_type: Option<&str>,
    target_id: Option<&str>,
    time_range: Option<&TimeRange>,
) -> MetadataFilter {
    let user = user_id.to_string();
    let mut clauses = Vec::new();

    match conversation_type {
        Some(PRIVATE) => {
            clauses.push(MetadataFilter::Eq("conversation_type", PRIVATE.to_string()));
            match target_id {
                Some(target) => clauses.push(MetadataFilter::Or(vec![
                    MetadataFilter::And(vec![
                        MetadataFilter::Eq("sender_id", user.clone()),
                        MetadataFilter::Eq("receiver_id", target.to_string()),
                    ]),
                    MetadataFilter::And(vec![
                        MetadataFilter::Eq("sender_id", target.to_string()),
                        MetadataFilter::Eq("receiver_id", user.clone()),
                    ]),
                ])),
                None => clauses.push(participant_clause(&user)),
            }
        }
        Some(GROUP) => {
            clauses.push(MetadataFilter::Eq("conversation_type", GROUP.to_string()));
            clauses.push(MetadataFilter::Eq("sender_id", user.clone()));
            if let Some(target) = target_id {
                clauses.push(MetadataFilter::Eq("group_id", target.to_string()));
            }
        }
        _ => clauses.push(participant_clause(&user)),
    }

    if let Some(range) = time_range {
        let (from, to) = range.bounds();
        clauses.push(MetadataFilter::Range {
            field: "timestamp",
            from,
            to,
        });
    }

    if clauses.len() == 1 {
        clauses.pop().expect("one clause")
    } else {
        MetadataFilter::And(clauses)
    }
}

fn participant_clause(user: &str) -> MetadataFilter {
    MetadataFilter::Or(vec![
        MetadataFilter::Eq("sender_id", user.to_string()),
        MetadataFilter::Eq("receiver_id", user.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::index::InMemoryVectorIndex;

    /// Maps every non-empty text to the same vector so that filtering, not
    /// similarity, decides what comes back.
    struct FlatEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for FlatEmbeddings {
        fn name(&self) -> &str {
            "flat"
        }

        async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, AiError> {
            if text.trim().is_empty() {
                return Ok(None);
            }
            Ok(Some(vec![1.0, 0.0]))
        }
    }

    fn search_over(index: Arc<InMemoryVectorIndex>) -> MessageSearch {
        MessageSearch::new(Arc::new(FlatEmbeddings), index)
    }

    fn message(
        id: &str,
        sender: &str,
        receiver: Option<&str>,
        group: Option<&str>,
        kind: &str,
        timestamp: &str,
    ) -> IndexMessageRequest {
        IndexMessageRequest {
            message_id: id.to_string(),
            text: format!("message {}", id),
            sender_id: sender.to_string(),
            receiver_id: receiver.map(String::from),
            group_id: group.map(String::from),
            conversation_type: Some(kind.to_string()),
            timestamp: Some(timestamp.to_string()),
        }
    }

    const TS: &str = "2024-05-01T12:00:00Z";

    #[tokio::test]
    async fn blank_text_is_a_noop() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index.clone());

        let indexed = search
            .index_message(IndexMessageRequest {
                message_id: "m1".to_string(),
                text: "  ".to_string(),
                sender_id: "u1".to_string(),
                ..Default::default()
            })
            .await
            .expect("no-op");

        assert!(!indexed);
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn missing_sender_is_rejected() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index);

        let err = search
            .index_message(IndexMessageRequest {
                message_id: "m1".to_string(),
                text: "hello".to_string(),
                ..Default::default()
            })
            .await
            .expect_err("invalid");
        assert!(matches!(err, AiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn conversation_type_defaults_to_private() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index.clone());

        search
            .index_message(IndexMessageRequest {
                message_id: "m1".to_string(),
                text: "hello".to_string(),
                sender_id: "u1".to_string(),
                timestamp: Some(TS.to_string()),
                ..Default::default()
            })
            .await
            .expect("indexed");

        let results = search
            .search(SearchQuery {
                query: "hello".to_string(),
                user_id: "u1".to_string(),
                conversation_type: None,
                target_id: None,
                limit: 5,
                time_range: None,
            })
            .await
            .expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.conversation_type, PRIVATE);
    }

    #[tokio::test]
    async fn private_target_restricts_to_the_pair() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index);

        for request in [
            message("m1", "u1", Some("u2"), None, PRIVATE, TS),
            message("m2", "u2", Some("u1"), None, PRIVATE, TS),
            message("m3", "u1", Some("u3"), None, PRIVATE, TS),
            message("m4", "u3", Some("u2"), None, PRIVATE, TS),
            message("m5", "u1", None, Some("g1"), GROUP, TS),
        ] {
            search.index_message(request).await.expect("indexed");
        }

        let results = search
            .search(SearchQuery {
                query: "message".to_string(),
                user_id: "u1".to_string(),
                conversation_type: Some(PRIVATE.to_string()),
                target_id: Some("u2".to_string()),
                limit: 10,
                time_range: None,
            })
            .await
            .expect("search");

        assert_eq!(results.len(), 2);
        for result in results {
            let pair = (
                result.metadata.sender_id.as_str(),
                result.metadata.receiver_id.as_deref().unwrap_or(""),
            );
            assert!(pair == ("u1", "u2") || pair == ("u2", "u1"));
        }
    }

    #[tokio::test]
    async fn group_search_requires_own_messages_in_target_group() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index);

        for request in [
            message("m1", "u1", None, Some("g1"), GROUP, TS),
            message("m2", "u2", None, Some("g1"), GROUP, TS),
            message("m3", "u1", None, Some("g2"), GROUP, TS),
            message("m4", "u1", Some("u2"), None, PRIVATE, TS),
        ] {
            search.index_message(request).await.expect("indexed");
        }

        let results = search
            .search(SearchQuery {
                query: "message".to_string(),
                user_id: "u1".to_string(),
                conversation_type: Some(GROUP.to_string()),
                target_id: Some("g1".to_string()),
                limit: 10,
                time_range: None,
            })
            .await
            .expect("search");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.message_id, "m1");
    }

    #[tokio::test]
    async fn unscoped_search_sees_both_directions_only() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index);

        for request in [
            message("m1", "u1", Some("u2"), None, PRIVATE, TS),
            message("m2", "u3", Some("u1"), None, PRIVATE, TS),
            message("m3", "u2", Some("u3"), None, PRIVATE, TS),
        ] {
            search.index_message(request).await.expect("indexed");
        }

        let results = search
            .search(SearchQuery {
                query: "message".to_string(),
                user_id: "u1".to_string(),
                conversation_type: None,
                target_id: None,
                limit: 10,
                time_range: None,
            })
            .await
            .expect("search");

        let ids: Vec<_> = results
            .iter()
            .map(|r| r.metadata.message_id.as_str())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"m1") && ids.contains(&"m2"));
    }

    #[tokio::test]
    async fn custom_time_range_filters_inclusively() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index);

        for request in [
            message("old", "u1", Some("u2"), None, PRIVATE, "2024-04-01T10:00:00Z"),
            message("edge", "u1", Some("u2"), None, PRIVATE, "2024-05-01T00:00:00Z"),
            message("mid", "u1", Some("u2"), None, PRIVATE, "2024-05-01T15:00:00Z"),
        ] {
            search.index_message(request).await.expect("indexed");
        }

        let results = search
            .search(SearchQuery {
                query: "message".to_string(),
                user_id: "u1".to_string(),
                conversation_type: Some(PRIVATE.to_string()),
                target_id: None,
                limit: 10,
                time_range: Some(TimeRange::Custom {
                    date_from: "2024-05-01T00:00:00Z".to_string(),
                    date_to: "2024-05-02T00:00:00Z".to_string(),
                }),
            })
            .await
            .expect("search");

        let ids: Vec<_> = results
            .iter()
            .map(|r| r.metadata.message_id.as_str())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"edge") && ids.contains(&"mid"));
    }

    #[tokio::test]
    async fn delete_removes_from_index() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let search = search_over(index.clone());

        search
            .index_message(message("m1", "u1", Some("u2"), None, PRIVATE, TS))
            .await
            .expect("indexed");
        search.delete_message("m1").await.expect("deleted");
        assert!(index.is_empty());
    }

    #[test]
    fn time_range_labels_parse() {
        assert_eq!(TimeRange::parse("today"), Some(TimeRange::Today));
        assert_eq!(TimeRange::parse(" WEEK "), Some(TimeRange::Week));
        assert_eq!(TimeRange::parse("month"), Some(TimeRange::Month));
        assert_eq!(TimeRange::parse("yesterday"), None);
    }

    #[test]
    fn symbolic_bounds_resolve_against_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 13, 30, 0).unwrap();

        let (from, to) = TimeRange::Today.bounds_at(now);
        assert_eq!(from, "2024-05-15T00:00:00Z");
        assert_eq!(to, "2024-05-15T13:30:00Z");

        let (from, _) = TimeRange::Week.bounds_at(now);
        assert_eq!(from, "2024-05-08T13:30:00Z");

        let (from, _) = TimeRange::Month.bounds_at(now);
        assert_eq!(from, "2024-04-15T13:30:00Z");
    }

    #[test]
    fn private_pair_filter_shape() {
        let filter = build_filter("u1", Some(PRIVATE), Some("u2"), None);
        let MetadataFilter::And(clauses) = filter else {
            panic!("expected And at the top");
        };
        assert_eq!(
            clauses[0],
            MetadataFilter::Eq("conversation_type", PRIVATE.to_string())
        );
        let MetadataFilter::Or(pairs) = &clauses[1] else {
            panic!("expected Or of sender/receiver pairs");
        };
        assert_eq!(pairs.len(), 2);
    }
}
