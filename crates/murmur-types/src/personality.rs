//! Reusable personality prompts.
//!
//! A personality is a named system prompt a user can activate. At most one
//! personality per user is active at a time; activation deactivates all
//! others. `has_memory` controls whether prompts built under the
//! personality include the full conversation history or only the current
//! user message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// Unique identifier for a personality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonalityId(pub Uuid);

impl PersonalityId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PersonalityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonalityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A named, reusable system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personality {
    pub id: PersonalityId,
    pub user_id: UserId,
    pub name: String,
    pub prompt: String,
    pub is_active: bool,
    pub has_memory: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Personality {
    /// Create a new inactive personality.
    pub fn new(user_id: UserId, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PersonalityId::new(),
            user_id,
            name: name.into(),
            prompt: prompt.into(),
            is_active: false,
            has_memory: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial personality update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalityUpdate {
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub has_memory: Option<bool>,
}
