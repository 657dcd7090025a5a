pub mod search;

use serde_json::json;

use crate::llm::ToolDefinition;

pub const WEB_SEARCH_TOOL: &str = "webSearch";

/// Closed set of tool kinds the orchestrator can dispatch. Wire-level tool
/// names stay strings for LLM-provider compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    WebSearch,
}

impl ToolKind {
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            WEB_SEARCH_TOOL => Some(ToolKind::WebSearch),
            _ => None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            ToolKind::WebSearch => WEB_SEARCH_TOOL,
        }
    }

    pub fn definition(self) -> ToolDefinition {
        match self {
            ToolKind::WebSearch => ToolDefinition::new(
                WEB_SEARCH_TOOL,
                "Search the web for current information the chat history cannot answer.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                }),
            ),
        }
    }
}

/// Tool definitions advertised to the LLM on every completion.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![ToolKind::WebSearch.definition()]
}
