//! In-memory session state.
//!
//! One `SessionState` per client session, owned exclusively by the
//! `SessionController` and mutated only through its methods. This is the
//! single source of truth the UI renders from.

use murmur_types::chat::{Chat, ChatId, ChatMessage};
use murmur_types::personality::Personality;
use murmur_types::settings::UserSettings;
use murmur_types::user::UserId;

/// All in-memory application state for one client session.
#[derive(Debug, Default)]
pub struct SessionState {
    pub(crate) user: Option<UserId>,
    pub(crate) chats: Vec<Chat>,
    pub(crate) current_chat_id: Option<ChatId>,
    /// Messages of the active chat, mirroring persisted order.
    pub(crate) messages: Vec<ChatMessage>,
    /// Process-lifetime running token total. Not persisted.
    pub(crate) total_tokens: u64,
    pub(crate) settings: Option<UserSettings>,
    pub(crate) personalities: Vec<Personality>,
    pub(crate) generating: bool,
}

impl SessionState {
    pub fn user(&self) -> Option<UserId> {
        self.user
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn current_chat_id(&self) -> Option<ChatId> {
        self.current_chat_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn settings(&self) -> Option<&UserSettings> {
        self.settings.as_ref()
    }

    pub fn personalities(&self) -> &[Personality] {
        &self.personalities
    }

    /// The user's single active personality, if any.
    pub fn active_personality(&self) -> Option<&Personality> {
        self.personalities.iter().find(|p| p.is_active)
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Drop everything scoped to the signed-out user.
    ///
    /// The running token total survives: it is process-lifetime, not
    /// user-lifetime.
    pub(crate) fn clear_user_data(&mut self) {
        self.chats.clear();
        self.current_chat_id = None;
        self.messages.clear();
        self.settings = None;
        self.personalities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_empty() {
        let state = SessionState::default();
        assert!(state.user().is_none());
        assert!(state.chats().is_empty());
        assert!(state.messages().is_empty());
        assert_eq!(state.total_tokens(), 0);
        assert!(!state.is_generating());
    }

    #[test]
    fn test_clear_user_data_keeps_token_total() {
        let mut state = SessionState {
            total_tokens: 42,
            ..Default::default()
        };
        state.chats.push(Chat::new(UserId::new()));
        state.clear_user_data();
        assert!(state.chats().is_empty());
        assert_eq!(state.total_tokens(), 42);
    }

    #[test]
    fn test_active_personality_lookup() {
        let user = UserId::new();
        let mut state = SessionState::default();
        let mut a = Personality::new(user, "A", "prompt a");
        let b = Personality::new(user, "B", "prompt b");
        a.is_active = true;
        state.personalities = vec![b, a];

        let active = state.active_personality().unwrap();
        assert_eq!(active.name, "A");
    }
}
