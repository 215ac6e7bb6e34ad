//! SQLite settings repository implementation.
//!
//! Implements `SettingsRepository` from `murmur-core`. The API key column
//! is encrypted with the vault before it touches the database and
//! decrypted on the way out; the rest of the system only ever sees
//! plaintext in memory.

use sqlx::Row;
use uuid::Uuid;

use murmur_core::store::SettingsRepository;
use murmur_types::error::RepositoryError;
use murmur_types::settings::{Theme, UserSettings};
use murmur_types::user::UserId;

use crate::crypto::VaultCrypto;

use super::chat::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `SettingsRepository`.
pub struct SqliteSettingsRepository {
    pool: DatabasePool,
    vault: VaultCrypto,
}

impl SqliteSettingsRepository {
    /// Create a new repository backed by the given pool and vault.
    pub fn new(pool: DatabasePool, vault: VaultCrypto) -> Self {
        Self { pool, vault }
    }

    fn encrypt_key(&self, api_key: Option<&str>) -> Result<Option<String>, RepositoryError> {
        api_key
            .map(|key| {
                self.vault
                    .encrypt(key)
                    .map_err(|e| RepositoryError::Query(format!("credential encrypt: {e}")))
            })
            .transpose()
    }

    fn decrypt_key(&self, stored: Option<String>) -> Result<Option<String>, RepositoryError> {
        stored
            .map(|blob| {
                self.vault
                    .decrypt(&blob)
                    .map_err(|e| RepositoryError::Query(format!("credential decrypt: {e}")))
            })
            .transpose()
    }
}

struct SettingsRow {
    id: String,
    user_id: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: i64,
    theme: String,
    created_at: String,
    updated_at: String,
}

impl SettingsRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            api_key: row.try_get("api_key")?,
            model: row.try_get("model")?,
            temperature: row.try_get("temperature")?,
            max_tokens: row.try_get("max_tokens")?,
            theme: row.try_get("theme")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_settings(self, api_key: Option<String>) -> Result<UserSettings, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid settings id: {e}")))?;
        let user_id = self
            .user_id
            .parse::<UserId>()
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let theme: Theme = self.theme.parse().map_err(RepositoryError::Query)?;

        Ok(UserSettings {
            id,
            user_id,
            api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens as u32,
            theme,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl SettingsRepository for SqliteSettingsRepository {
    async fn get_settings(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserSettings>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM user_settings WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let settings_row = SettingsRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let api_key = self.decrypt_key(settings_row.api_key.clone())?;
                Ok(Some(settings_row.into_settings(api_key)?))
            }
            None => Ok(None),
        }
    }

    async fn insert_settings(&self, settings: &UserSettings) -> Result<(), RepositoryError> {
        let encrypted = self.encrypt_key(settings.api_key.as_deref())?;

        sqlx::query(
            r#"INSERT INTO user_settings (id, user_id, api_key, model, temperature, max_tokens, theme, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(settings.id.to_string())
        .bind(settings.user_id.to_string())
        .bind(encrypted)
        .bind(&settings.model)
        .bind(settings.temperature)
        .bind(settings.max_tokens as i64)
        .bind(settings.theme.to_string())
        .bind(format_datetime(&settings.created_at))
        .bind(format_datetime(&settings.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!(
                        "settings already exist for user {}",
                        settings.user_id
                    ));
                }
            }
            RepositoryError::Query(e.to_string())
        })?;

        Ok(())
    }

    async fn update_settings(&self, settings: &UserSettings) -> Result<(), RepositoryError> {
        let encrypted = self.encrypt_key(settings.api_key.as_deref())?;

        let result = sqlx::query(
            r#"UPDATE user_settings
               SET api_key = ?, model = ?, temperature = ?, max_tokens = ?, theme = ?, updated_at = ?
               WHERE user_id = ?"#,
        )
        .bind(encrypted)
        .bind(&settings.model)
        .bind(settings.temperature)
        .bind(settings.max_tokens as i64)
        .bind(settings.theme.to_string())
        .bind(format_datetime(&settings.updated_at))
        .bind(settings.user_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repo() -> SqliteSettingsRepository {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        let pool = DatabasePool::new(&url).await.unwrap();
        SqliteSettingsRepository::new(pool, VaultCrypto::new(&[3u8; 32]))
    }

    #[tokio::test]
    async fn test_missing_settings_is_none() {
        let repo = test_repo().await;
        let found = repo.get_settings(&UserId::new()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_insert_and_get_defaults() {
        let repo = test_repo().await;
        let user_id = UserId::new();

        let defaults = UserSettings::defaults(user_id);
        repo.insert_settings(&defaults).await.unwrap();

        let found = repo.get_settings(&user_id).await.unwrap().unwrap();
        assert_eq!(found.id, defaults.id);
        assert_eq!(found.model, "gpt-4o");
        assert_eq!(found.max_tokens, 2000);
        assert_eq!(found.theme, Theme::Light);
        assert!(found.api_key.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let repo = test_repo().await;
        let user_id = UserId::new();

        repo.insert_settings(&UserSettings::defaults(user_id))
            .await
            .unwrap();
        let err = repo
            .insert_settings(&UserSettings::defaults(user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_api_key_roundtrips_through_vault() {
        let repo = test_repo().await;
        let user_id = UserId::new();

        let mut settings = UserSettings::defaults(user_id);
        settings.api_key = Some("sk-live-key".to_string());
        repo.insert_settings(&settings).await.unwrap();

        let found = repo.get_settings(&user_id).await.unwrap().unwrap();
        assert_eq!(found.api_key.as_deref(), Some("sk-live-key"));

        // The stored column holds ciphertext, not the key.
        let raw: Option<String> =
            sqlx::query("SELECT api_key FROM user_settings WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap()
                .try_get("api_key")
                .unwrap();
        let raw = raw.unwrap();
        assert_ne!(raw, "sk-live-key");
        assert!(!raw.contains("sk-live"));
    }

    #[tokio::test]
    async fn test_update_settings_overwrites_row() {
        let repo = test_repo().await;
        let user_id = UserId::new();

        let mut settings = UserSettings::defaults(user_id);
        repo.insert_settings(&settings).await.unwrap();

        settings.model = "gpt-4o-mini".to_string();
        settings.temperature = 1.5;
        settings.max_tokens = 3000;
        settings.theme = Theme::Dark;
        settings.api_key = Some("sk-updated".to_string());
        repo.update_settings(&settings).await.unwrap();

        let found = repo.get_settings(&user_id).await.unwrap().unwrap();
        assert_eq!(found.model, "gpt-4o-mini");
        assert!((found.temperature - 1.5).abs() < f64::EPSILON);
        assert_eq!(found.max_tokens, 3000);
        assert_eq!(found.theme, Theme::Dark);
        assert_eq!(found.api_key.as_deref(), Some("sk-updated"));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let repo = test_repo().await;
        let err = repo
            .update_settings(&UserSettings::defaults(UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
