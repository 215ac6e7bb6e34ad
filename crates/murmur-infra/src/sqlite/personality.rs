//! SQLite personality repository implementation.
//!
//! Implements `PersonalityRepository` from `murmur-core`. Activation runs
//! as a single transaction (deactivate all of the user's rows, then
//! activate the target) so at most one personality is ever active, even
//! under concurrent toggles.

use sqlx::Row;

use murmur_core::store::PersonalityRepository;
use murmur_types::error::RepositoryError;
use murmur_types::personality::{Personality, PersonalityId};
use murmur_types::user::UserId;

use super::chat::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `PersonalityRepository`.
pub struct SqlitePersonalityRepository {
    pool: DatabasePool,
}

impl SqlitePersonalityRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_personality(row: &sqlx::sqlite::SqliteRow) -> Result<Personality, RepositoryError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let user_id_str: String = row
        .try_get("user_id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let prompt: String = row
        .try_get("prompt")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let is_active: bool = row
        .try_get("is_active")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let has_memory: bool = row
        .try_get("has_memory")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_at_str: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let updated_at_str: String = row
        .try_get("updated_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(Personality {
        id: id_str
            .parse::<PersonalityId>()
            .map_err(|e| RepositoryError::Query(format!("invalid personality id: {e}")))?,
        user_id: user_id_str
            .parse::<UserId>()
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?,
        name,
        prompt,
        is_active,
        has_memory,
        created_at: parse_datetime(&created_at_str)?,
        updated_at: parse_datetime(&updated_at_str)?,
    })
}

impl PersonalityRepository for SqlitePersonalityRepository {
    async fn create_personality(&self, personality: &Personality) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO personalities (id, user_id, name, prompt, is_active, has_memory, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(personality.id.to_string())
        .bind(personality.user_id.to_string())
        .bind(&personality.name)
        .bind(&personality.prompt)
        .bind(personality.is_active)
        .bind(personality.has_memory)
        .bind(format_datetime(&personality.created_at))
        .bind(format_datetime(&personality.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_personalities(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Personality>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM personalities WHERE user_id = ? ORDER BY created_at DESC")
                .bind(user_id.to_string())
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut personalities = Vec::with_capacity(rows.len());
        for row in &rows {
            personalities.push(row_to_personality(row)?);
        }

        Ok(personalities)
    }

    async fn update_personality(&self, personality: &Personality) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE personalities
               SET name = ?, prompt = ?, is_active = ?, has_memory = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&personality.name)
        .bind(&personality.prompt)
        .bind(personality.is_active)
        .bind(personality.has_memory)
        .bind(format_datetime(&personality.updated_at))
        .bind(personality.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_personality(
        &self,
        personality_id: &PersonalityId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM personalities WHERE id = ?")
            .bind(personality_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn activate_personality(
        &self,
        user_id: &UserId,
        personality_id: &PersonalityId,
    ) -> Result<(), RepositoryError> {
        // One transaction: deactivate everything, then activate the target.
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("UPDATE personalities SET is_active = 0 WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query("UPDATE personalities SET is_active = 1 WHERE id = ?")
            .bind(personality_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}
