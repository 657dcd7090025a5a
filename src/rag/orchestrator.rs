//! The RAG control loop.
//!
//! One `ask` call runs: persona detection, transcript load/seed, grounding
//! search, a bounded tool-calling loop against the LLM, and transcript
//! persistence. State machine per invocation:
//! NEW -> SYSTEM_SEEDED -> AWAITING_LLM -> (TOOL_REQUESTED -> AWAITING_LLM)*
//! -> ANSWERED | EXHAUSTED, with at most `MAX_TOOL_ITERATIONS` LLM calls.

use std::sync::Arc;

use chrono::DateTime;
use serde::Serialize;

use crate::core::errors::AiError;
use crate::llm::{ChatTurn, CompletionRequest, LlmProvider};
use crate::memory::ConversationMemory;
use crate::personas;
use crate::search::{MessageMatch, MessageSearch, SearchQuery};
use crate::tools::{self, ToolKind};
use crate::tools::search::WebSearchProvider;

pub const MAX_TOOL_ITERATIONS: usize = 5;
const CONTEXT_LIMIT: usize = 5;
const WEB_RESULT_LIMIT: usize = 5;

const NO_CONTEXT_MARKER: &str = "No relevant messages were found in the chat history.";
const EXHAUSTED_ANSWER: &str = "I could not produce an answer after several attempts. \
    Please try rephrasing your question.";

#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub question: String,
    pub user_id: String,
    pub thread_id: String,
    pub conversation_type: Option<String>,
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub persona: String,
    pub sources: Vec<AnswerSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerSource {
    pub text: String,
    pub sender: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub conversation_type: String,
}

pub struct RagOrchestrator {
    llm: Arc<dyn LlmProvider>,
    web: Arc<dyn WebSearchProvider>,
    memory: Arc<dyn ConversationMemory>,
    search: Arc<MessageSearch>,
}

impl RagOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        web: Arc<dyn WebSearchProvider>,
        memory: Arc<dyn ConversationMemory>,
        search: Arc<MessageSearch>,
    ) -> Self {
        Self {
            llm,
            web,
            memory,
            search,
        }
    }

    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, AiError> {
        require("question", &request.question)?;
        require("user_id", &request.user_id)?;
        require("thread_id", &request.thread_id)?;

        let (persona, clean_message) = personas::detect(&request.question);
        tracing::debug!(
            "ask on thread {} with persona {}",
            request.thread_id,
            persona.key
        );

        let mut transcript = self.memory.get(&request.thread_id).await;
        if transcript.is_empty() {
            transcript.push(ChatTurn::system(persona.system_prompt));
        }

        let matches = self
            .search
            .search(SearchQuery {
                query: clean_message.clone(),
                user_id: request.user_id.clone(),
                conversation_type: request.conversation_type.clone(),
                target_id: request.target_id.clone(),
                limit: CONTEXT_LIMIT,
                time_range: None,
            })
            .await?;

        let context = build_context_block(&matches);
        transcript.push(ChatTurn::user(format!("{}\n\n{}", clean_message, context)));

        for _ in 0..MAX_TOOL_ITERATIONS {
            let completion = CompletionRequest::new(transcript.clone())
                .with_tools(tools::definitions())
                .with_temperature(0.0);
            let assistant = self.llm.complete(completion).await?;
            transcript.push(assistant.clone());

            if !assistant.has_tool_calls() {
                self.memory.save(&request.thread_id, transcript).await;
                return Ok(AskResponse {
                    answer: assistant.content,
                    persona: persona.key.to_string(),
                    sources: matches.iter().map(to_source).collect(),
                });
            }

            for call in assistant.tool_calls.as_deref().unwrap_or_default() {
                let turn = match ToolKind::from_wire(&call.function.name) {
                    Some(ToolKind::WebSearch) => {
                        let args = call.arguments_value();
                        let query = args
                            .get("query")
                            .and_then(|v| v.as_str())
                            .unwrap_or("")
                            .trim()
                            .to_string();
                        let content = if query.is_empty() {
                            tracing::warn!("webSearch call {} carried no query", call.id);
                            "Search query missing.".to_string()
                        } else {
                            self.web.search(&query, WEB_RESULT_LIMIT).await?
                        };
                        ChatTurn::tool(call.id.as_str(), ToolKind::WebSearch.wire_name(), content)
                    }
                    None => {
                        tracing::warn!("model requested unknown tool {}", call.function.name);
                        ChatTurn::tool(
                            call.id.as_str(),
                            call.function.name.clone(),
                            format!("Tool '{}' is not available.", call.function.name),
                        )
                    }
                };
                transcript.push(turn);
            }
        }

        // Loop exhausted: degraded answer, and the stuck transcript is
        // deliberately not written back to memory.
        tracing::warn!(
            "tool loop exhausted after {} iterations on thread {}",
            MAX_TOOL_ITERATIONS,
            request.thread_id
        );
        Ok(AskResponse {
            answer: EXHAUSTED_ANSWER.to_string(),
            persona: persona.key.to_string(),
            sources: Vec::new(),
        })
    }
}

fn require(name: &str, value: &str) -> Result<(), AiError> {
    if value.trim().is_empty() {
        return Err(AiError::InvalidRequest(format!("{} is required", name)));
    }
    Ok(())
}

fn to_source(m: &MessageMatch) -> AnswerSource {
    AnswerSource {
        text: m.text.clone(),
        sender: m.metadata.sender_id.clone(),
        timestamp: m.metadata.timestamp.clone(),
        conversation_type: m.metadata.conversation_type.clone(),
    }
}

fn build_context_block(matches: &[MessageMatch]) -> String {
    if matches.is_empty() {
        return NO_CONTEXT_MARKER.to_string();
    }

    let mut block = String::from("Relevant messages from the chat history:\n");
    for (i, m) in matches.iter().enumerate() {
        block.push_str(&format!(
            "{}. \"{}\" ({}, {})\n",
            i + 1,
            m.text,
            m.metadata.conversation_type,
            display_date(&m.metadata.timestamp)
        ));
    }
    block.trim_end().to_string()
}

fn display_date(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%b %-d, %Y %H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
