//! State-change events published by the session controller.
//!
//! Front ends subscribe to these instead of polling shared state; each
//! event names which slice of session state changed so subscribers can
//! re-read just that slice.

use serde::{Deserialize, Serialize};

use crate::chat::ChatId;

/// Notification that a slice of session state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// The signed-in user changed (including sign-out).
    UserChanged,

    /// The chat list changed (load, create, delete, rename).
    ChatsChanged,

    /// The active chat's message list changed structurally (append,
    /// rollback, load, clear) or a usage snapshot was attached.
    MessagesChanged,

    /// A streamed fragment was appended to the pending assistant message.
    AssistantDelta { chat_id: ChatId, text: String },

    /// The settings record changed.
    SettingsChanged,

    /// The personality list or active personality changed.
    PersonalitiesChanged,

    /// A send turn entered the `sending` state.
    GenerationStarted { chat_id: ChatId },

    /// A send turn finished, successfully or not.
    GenerationFinished { chat_id: ChatId },
}
