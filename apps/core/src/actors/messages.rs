use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::brain::Category;
use crate::models::Message;

// Re-export AppError for convenience
pub use crate::error::AppError;

/// A message in the OpenAI chat-completion format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Messages that can be sent to the `LlmActor`.
#[derive(Debug)]
pub enum LlmMessage {
    /// A request to generate a complete chat response.
    Complete {
        messages: Vec<ChatMessage>,
        /// A channel to send the final `String` result back.
        responder: oneshot::Sender<Result<String, AppError>>,
    },
}

/// Messages that can be sent to the `RagActor`.
#[derive(Debug)]
pub enum RagMessage {
    /// A request to ingest content into the knowledge base.
    Ingest {
        content: String,
        /// Where the content came from (file name, page...).
        source: Option<String>,
        /// A channel to send the number of stored chunks back.
        responder: oneshot::Sender<Result<usize, AppError>>,
    },
    /// A request to search the knowledge base.
    Search {
        query: String,
        /// The maximum number of results to return.
        limit: usize,
        /// A channel to send the search results back.
        responder: oneshot::Sender<Result<Vec<SearchResult>, AppError>>,
    },
}

/// A knowledge-base snippet returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub content: String,
    pub source: Option<String>,
    pub score: f32,
}

/// The assistant side of a processed user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    pub session_id: String,
    /// Category the user message was routed to.
    pub category: Category,
    /// Text appended to the transcript.
    pub content: String,
}

/// Messages that can be sent to the `SupervisorActor`.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// A request to open a new conversation.
    CreateSession {
        responder: oneshot::Sender<Result<String, AppError>>,
    },
    /// A request to process a user's message from a specific session.
    ProcessUserMessage {
        session_id: String,
        content: String,
        /// A channel to send the assistant reply back.
        responder: oneshot::Sender<Result<TurnReply, AppError>>,
    },
    /// A request to reset a session to its greeting.
    ClearSession {
        session_id: String,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    /// A request for a copy of a session transcript.
    GetTranscript {
        session_id: String,
        responder: oneshot::Sender<Result<Vec<Message>, AppError>>,
    },
    /// A request to ingest content, which the supervisor will delegate to the RAG actor.
    IngestContent {
        content: String,
        source: Option<String>,
        responder: oneshot::Sender<Result<usize, AppError>>,
    },
    /// A command to shut down the supervisor.
    Shutdown,
}
