//! Per-user settings for Murmur.
//!
//! Exactly one settings record exists per user, lazily created with
//! defaults on first access. The API key is stored encrypted at rest;
//! in memory it is plaintext and lives only here and in the completion
//! client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// UI theme preference, persisted but applied by the front end.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (theme IN ('light', 'dark'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("invalid theme: '{other}'")),
        }
    }
}

/// One user's settings record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub id: Uuid,
    pub user_id: UserId,
    /// Completion provider API key, plaintext in memory.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;
    pub const DEFAULT_MAX_TOKENS: u32 = 2000;

    pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;
    pub const MAX_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 100..=4000;

    /// Create a defaults record for a user.
    pub fn defaults(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            api_key: None,
            model: Self::DEFAULT_MODEL.to_string(),
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            theme: Theme::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a non-blank API key is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Partial settings update. `None` fields are left untouched.
///
/// For `api_key`, a blank string clears the stored key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub theme: Option<Theme>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_roundtrip() {
        for theme in [Theme::Light, Theme::Dark] {
            let parsed: Theme = theme.to_string().parse().unwrap();
            assert_eq!(theme, parsed);
        }
    }

    #[test]
    fn test_defaults() {
        let settings = UserSettings::defaults(UserId::new());
        assert_eq!(settings.model, "gpt-4o");
        assert!((settings.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.max_tokens, 2000);
        assert_eq!(settings.theme, Theme::Light);
        assert!(settings.api_key.is_none());
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_has_api_key_blank_is_absent() {
        let mut settings = UserSettings::defaults(UserId::new());
        settings.api_key = Some("   ".to_string());
        assert!(!settings.has_api_key());

        settings.api_key = Some("sk-test".to_string());
        assert!(settings.has_api_key());
    }

    #[test]
    fn test_settings_update_default_is_empty() {
        let update = SettingsUpdate::default();
        assert!(update.api_key.is_none());
        assert!(update.model.is_none());
        assert!(update.theme.is_none());
    }
}
