//! Vector index abstraction.
//!
//! This module provides:
//! - `VectorIndex` trait for abstraction over different vector databases
//! - `MetadataFilter`, a typed predicate AST that backends translate to
//!   their native filter language
//! - an in-process backend for local development and tests
//! - a REST backend for Pinecone-compatible services

mod memory;
mod pinecone;

pub use memory::InMemoryVectorIndex;
pub use pinecone::PineconeIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::AiError;

/// Result of a vector similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub text: String,
    /// Similarity score (higher is more similar)
    pub score: f64,
    pub metadata: Value,
}

/// Attribute predicate applied alongside the similarity query.
///
/// String comparison is used for `Range`; timestamps are stored as
/// zero-padded ISO-8601, which sorts lexicographically.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    And(Vec<MetadataFilter>),
    Or(Vec<MetadataFilter>),
    Eq(&'static str, String),
    Range {
        field: &'static str,
        from: String,
        to: String,
    },
}

impl MetadataFilter {
    /// Evaluate the predicate against a metadata object. Used by
    /// client-side backends; remote backends translate the AST instead.
    pub fn matches(&self, metadata: &Value) -> bool {
        match self {
            MetadataFilter::And(clauses) => clauses.iter().all(|c| c.matches(metadata)),
            MetadataFilter::Or(clauses) => clauses.iter().any(|c| c.matches(metadata)),
            MetadataFilter::Eq(field, expected) => metadata
                .get(field)
                .and_then(|v| v.as_str())
                .map(|v| v == expected)
                .unwrap_or(false),
            MetadataFilter::Range { field, from, to } => metadata
                .get(field)
                .and_then(|v| v.as_str())
                .map(|v| v >= from.as_str() && v <= to.as_str())
                .unwrap_or(false),
        }
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a record by id.
    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        text: &str,
        metadata: Value,
    ) -> Result<(), AiError>;

    /// Similarity query, ranked by descending score, length <= limit.
    async fn query(
        &self,
        vector: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, AiError>;

    /// Delete a record by id.
    async fn delete(&self, id: &str) -> Result<(), AiError>;
}
