//! PersonalityRepository trait definition.
//!
//! Personalities list newest-first. Activation must be atomic from the
//! caller's point of view: deactivate all of the user's personalities,
//! then activate the target, inside one transaction.

use murmur_types::error::RepositoryError;
use murmur_types::personality::{Personality, PersonalityId};
use murmur_types::user::UserId;

/// Repository trait for personality persistence.
pub trait PersonalityRepository: Send + Sync {
    /// Insert a new personality.
    fn create_personality(
        &self,
        personality: &Personality,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List a user's personalities, ordered by created_at DESC.
    fn list_personalities(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Personality>, RepositoryError>> + Send;

    /// Overwrite a personality row.
    fn update_personality(
        &self,
        personality: &Personality,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a personality.
    fn delete_personality(
        &self,
        personality_id: &PersonalityId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Make `personality_id` the user's only active personality.
    ///
    /// Deactivates every personality owned by `user_id`, then activates
    /// the target, in a single transaction.
    fn activate_personality(
        &self,
        user_id: &UserId,
        personality_id: &PersonalityId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
