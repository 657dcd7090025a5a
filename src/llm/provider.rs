use async_trait::async_trait;

use super::types::{ChatTurn, CompletionRequest};
use crate::core::errors::AiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming); the returned assistant turn may
    /// carry tool calls
    async fn complete(&self, request: CompletionRequest) -> Result<ChatTurn, AiError>;
}
