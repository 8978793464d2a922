use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Represents a single message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The text content of the message.
    pub content: String,
    /// Unix timestamp of when the message was created.
    pub created_at: i64,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Represents a chat session: an append-only transcript that always opens
/// with the assistant greeting, plus the model-answered exchanges that feed
/// the prompt history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    /// The unique identifier for the session (UUID).
    pub id: String,
    /// Unix timestamp of when the session was created.
    pub created_at: i64,
    greeting: String,
    messages: Vec<Message>,
    memory: Vec<Message>,
}

impl ConversationSession {
    /// Creates a session whose transcript holds only the greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now().timestamp(),
            messages: vec![Message::new(Role::Assistant, greeting.clone())],
            memory: Vec::new(),
            greeting,
        }
    }

    /// Appends an entry and returns it.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Message {
        self.messages.push(Message::new(role, content));
        &self.messages[self.messages.len() - 1]
    }

    /// Drops the conversation and starts over from the greeting.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.messages.clear();
        self.messages
            .push(Message::new(Role::Assistant, self.greeting.clone()));
    }

    /// The transcript, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Number of user turns so far.
    pub fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    /// Records a question the model answered, with the raw model answer.
    /// Canned replies, the greeting and fallbacks never go through here.
    pub fn remember_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.memory.push(Message::new(Role::User, question));
        self.memory.push(Message::new(Role::Assistant, answer));
    }

    /// The remembered exchanges rendered as `role: content` lines, for prompting.
    pub fn history_text(&self) -> String {
        self.memory
            .iter()
            .map(|msg| format!("{}: {}", msg.role, msg.content))
            .collect::<Vec<String>>()
            .join("\n")
    }
}
