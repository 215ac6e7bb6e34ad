//! Completion request/response types for Murmur.
//!
//! These types model the data shapes exchanged with completion providers:
//! role-tagged prompt messages, generation parameters, streamed chunks,
//! token usage, and error handling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in a completion prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for PromptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptRole::System => write!(f, "system"),
            PromptRole::User => write!(f, "user"),
            PromptRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for PromptRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(PromptRole::System),
            "user" => Ok(PromptRole::User),
            "assistant" => Ok(PromptRole::Assistant),
            other => Err(format!("invalid prompt role: '{other}'")),
        }
    }
}

/// A single role-tagged message in a completion prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generation parameters for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Token usage reported by the provider for one completion.
///
/// Counts are cumulative for the request: prompt tokens consumed,
/// completion tokens generated, and their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One incremental event from a streaming completion.
///
/// `content` may be empty; a usage snapshot rides on the chunk where the
/// provider reported it. When usage only arrives as the stream closes, a
/// trailing chunk with empty content carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    pub fn usage(usage: TokenUsage) -> Self {
        Self {
            content: String::new(),
            usage: Some(usage),
        }
    }
}

/// Errors from completion client operations.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// No usable API key is configured. Raised before any network I/O.
    #[error("no API key configured -- add your key in settings")]
    NotConfigured,

    /// The provider rejected the request or the transport failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// The stream broke mid-flight after a successful connection.
    #[error("stream error: {0}")]
    Stream(String),
}
