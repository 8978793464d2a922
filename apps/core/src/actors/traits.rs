use crate::actors::messages::{AppError, ChatMessage, SearchResult};
use async_trait::async_trait;

/// Defines the public interface for an LLM (Large Language Model) actor.
///
/// This trait abstracts the specific implementation of the LLM, allowing for different
/// backends (e.g., a hosted OpenAI-compatible API, a test double) to be used interchangeably.
#[async_trait]
pub trait LlmActor: Send + Sync + 'static {
    /// Generates a complete text response for a chat conversation.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AppError>;
}

/// Defines the public interface for a RAG (Retrieval-Augmented Generation) actor.
///
/// This trait abstracts the logic for managing and querying a knowledge base.
#[async_trait]
pub trait RagActor: Send + Sync + 'static {
    /// Ingests new content into the knowledge base, returning the number of chunks stored.
    async fn ingest(&self, content: String, source: Option<String>) -> Result<usize, AppError>;

    /// Searches the knowledge base for content relevant to a query.
    async fn search(&self, query: String, limit: usize) -> Result<Vec<SearchResult>, AppError>;
}
