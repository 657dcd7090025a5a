mod openai;
mod provider;
mod types;

pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{
    ChatTurn, CompletionRequest, FunctionCall, FunctionDef, Role, ToolCall, ToolDefinition,
    Transcript,
};
