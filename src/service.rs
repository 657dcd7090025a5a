//! Service facade: explicitly constructed, dependency-injected providers
//! wired once at startup. An HTTP layer (not part of this crate) consumes
//! these operations directly.

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::AiConfig;
use crate::core::errors::AiError;
use crate::embeddings::{EmbeddingProvider, OpenAiEmbeddings};
use crate::index::{PineconeIndex, VectorIndex};
use crate::llm::{LlmProvider, OpenAiProvider, Transcript};
use crate::memory::{ConversationMemory, InMemoryTtlMemory};
use crate::rag::{
    AskRequest, AskResponse, RagOrchestrator, Summarizer, SummaryRequest, SummaryResponse,
};
use crate::search::{IndexMessageRequest, MessageSearch};
use crate::tools::search::{HttpWebSearch, WebSearchProvider};

pub struct AiService {
    orchestrator: RagOrchestrator,
    summarizer: Summarizer,
    search: Arc<MessageSearch>,
    memory: Arc<dyn ConversationMemory>,
}

impl AiService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        web: Arc<dyn WebSearchProvider>,
        memory: Arc<dyn ConversationMemory>,
    ) -> Self {
        let search = Arc::new(MessageSearch::new(embeddings, index));
        let orchestrator =
            RagOrchestrator::new(llm.clone(), web, memory.clone(), search.clone());
        let summarizer = Summarizer::new(llm, search.clone());
        Self {
            orchestrator,
            summarizer,
            search,
            memory,
        }
    }

    /// Build the service with HTTP-backed providers from configuration.
    pub fn from_config(config: &AiConfig) -> Self {
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(&config.llm));
        let embeddings: Arc<dyn EmbeddingProvider> =
            Arc::new(OpenAiEmbeddings::new(&config.embeddings));
        let index: Arc<dyn VectorIndex> = Arc::new(PineconeIndex::new(&config.index));
        let web: Arc<dyn WebSearchProvider> =
            Arc::new(HttpWebSearch::new(config.web_search.clone()));
        let memory: Arc<dyn ConversationMemory> = Arc::new(InMemoryTtlMemory::with_ttl(
            Duration::from_secs(config.memory.ttl_hours * 3600),
        ));
        Self::new(llm, embeddings, index, web, memory)
    }

    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, AiError> {
        self.orchestrator.ask(request).await
    }

    pub async fn index_message(&self, request: IndexMessageRequest) -> Result<bool, AiError> {
        self.search.index_message(request).await
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<(), AiError> {
        self.search.delete_message(message_id).await
    }

    pub async fn summarize(&self, request: SummaryRequest) -> Result<SummaryResponse, AiError> {
        self.summarizer.summarize(request).await
    }

    pub async fn clear_memory(&self, thread_id: &str) {
        self.memory.clear(thread_id).await;
    }

    pub async fn memory(&self, thread_id: &str) -> Transcript {
        self.memory.get(thread_id).await
    }
}
