pub mod orchestrator;
pub mod summarizer;


pub use orchestrator::{AnswerSource, AskRequest, AskResponse, RagOrchestrator, MAX_TOOL_ITERATIONS};
pub use summarizer::{Summarizer, SummaryRequest, SummaryResponse, NO_MESSAGES_SUMMARY};
