//! Chat and message types for Murmur.
//!
//! Chats are ordered newest-first by `updated_at`; messages within a chat
//! are ordered by `created_at` ascending. The in-memory message list for
//! the active chat mirrors this persisted order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::llm::TokenUsage;
use crate::user::UserId;

/// Unique identifier for a chat, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub Uuid);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Role of a stored chat message.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A conversation owned by a user.
///
/// The title defaults to "New Chat" and is auto-derived from the first
/// user message once the first exchange completes, unless renamed first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Default title for a freshly created chat.
    pub const DEFAULT_TITLE: &'static str = "New Chat";

    /// Create a new chat with the default title.
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ChatId::new(),
            user_id,
            title: Self::DEFAULT_TITLE.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single message within a chat.
///
/// Content is mutable only while an assistant message is streaming;
/// once persisted it never changes. Assistant messages may carry the
/// provider's token usage snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Construct a user message with a fresh id and the current timestamp.
    pub fn user(chat_id: ChatId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            chat_id,
            role: MessageRole::User,
            content: content.into(),
            usage: None,
            created_at: Utc::now(),
        }
    }

    /// Construct an empty assistant placeholder to stream into.
    pub fn assistant_placeholder(chat_id: ChatId) -> Self {
        Self {
            id: MessageId::new(),
            chat_id,
            role: MessageRole::Assistant,
            content: String::new(),
            usage: None,
            created_at: Utc::now(),
        }
    }
}
