//! One-shot conversation summaries: bulk message search over a time
//! window, single LLM completion, no memory and no tool loop.

use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::AiError;
use crate::llm::{ChatTurn, CompletionRequest, LlmProvider};
use crate::personas;
use crate::search::{MessageSearch, SearchQuery, TimeRange};

pub const NO_MESSAGES_SUMMARY: &str = "No messages found for the specified time range.";
const SUMMARY_SEARCH_LIMIT: usize = 20;
const DEFAULT_TIME_RANGE: &str = "today";

#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    pub user_id: String,
    pub target_id: String,
    pub conversation_type: String,
    pub time_range: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub message_count: usize,
}

pub struct Summarizer {
    llm: Arc<dyn LlmProvider>,
    search: Arc<MessageSearch>,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmProvider>, search: Arc<MessageSearch>) -> Self {
        Self { llm, search }
    }

    pub async fn summarize(&self, request: SummaryRequest) -> Result<SummaryResponse, AiError> {
        if request.user_id.trim().is_empty() {
            return Err(AiError::InvalidRequest("user_id is required".to_string()));
        }
        if request.target_id.trim().is_empty() {
            return Err(AiError::InvalidRequest("target_id is required".to_string()));
        }

        let label = request
            .time_range
            .as_deref()
            .unwrap_or(DEFAULT_TIME_RANGE)
            .to_string();
        let range = TimeRange::parse(&label)
            .ok_or_else(|| AiError::InvalidRequest(format!("unknown time range: {}", label)))?;

        let matches = self
            .search
            .search(SearchQuery {
                query: format!("conversation {}", label),
                user_id: request.user_id.clone(),
                conversation_type: Some(request.conversation_type.clone()),
                target_id: Some(request.target_id.clone()),
                limit: SUMMARY_SEARCH_LIMIT,
                time_range: Some(range),
            })
            .await?;

        if matches.is_empty() {
            return Ok(SummaryResponse {
                summary: NO_MESSAGES_SUMMARY.to_string(),
                message_count: 0,
            });
        }

        let combined = matches
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let persona = personas::get("summarizer").unwrap_or_else(personas::default_persona);
        let completion = CompletionRequest::new(vec![
            ChatTurn::system(persona.system_prompt),
            ChatTurn::user(format!(
                "Summarize the following conversation messages from the {} time range:\n\n{}",
                label, combined
            )),
        ])
        .with_temperature(0.0);

        let assistant = self.llm.complete(completion).await?;
        Ok(SummaryResponse {
            summary: assistant.content,
            message_count: matches.len(),
        })
    }
}
