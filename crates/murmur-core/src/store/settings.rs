//! SettingsRepository trait definition.
//!
//! Exactly one settings row exists per user (UNIQUE on user_id). The
//! controller lazily inserts defaults on first load; updates write the
//! full row.

use murmur_types::error::RepositoryError;
use murmur_types::settings::UserSettings;
use murmur_types::user::UserId;

/// Repository trait for per-user settings persistence.
pub trait SettingsRepository: Send + Sync {
    /// Get the settings row for a user, if one exists.
    fn get_settings(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserSettings>, RepositoryError>> + Send;

    /// Insert a new settings row. Fails with `Conflict` if one already
    /// exists for the user.
    fn insert_settings(
        &self,
        settings: &UserSettings,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite the settings row for `settings.user_id`.
    fn update_settings(
        &self,
        settings: &UserSettings,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
