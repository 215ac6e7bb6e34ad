//! ChatRepository trait definition.
//!
//! CRUD for chats and their messages. The store is the system of record
//! for persisted identifiers and ordering: chats list newest-first by
//! `updated_at`, messages within a chat oldest-first by `created_at`.

use murmur_types::chat::{Chat, ChatId, ChatMessage};
use murmur_types::error::RepositoryError;
use murmur_types::user::UserId;

/// Repository trait for chat and message persistence.
///
/// Implementations live in murmur-infra (e.g., `SqliteChatRepository`).
pub trait ChatRepository: Send + Sync {
    /// Insert a new chat.
    fn create_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a chat by its unique ID.
    fn get_chat(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// List a user's chats, ordered by updated_at DESC.
    fn list_chats(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    /// Update a chat's title (also bumps updated_at).
    fn rename_chat(
        &self,
        chat_id: &ChatId,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a chat and, via cascade, its messages.
    fn delete_chat(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert a message and bump the owning chat's updated_at.
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a chat's messages, ordered by created_at ASC.
    fn list_messages(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Total number of messages stored for a chat.
    fn count_messages(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;
}
