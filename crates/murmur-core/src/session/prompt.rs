//! Outgoing prompt assembly.
//!
//! Projects the in-memory message list to role-tagged prompt messages and
//! applies the active personality, if any:
//!
//! - no personality: the projected history unchanged
//! - personality with memory: one system message prepended to the full history
//! - personality without memory: the system message plus only the current
//!   user message (earlier history deliberately excluded)

use murmur_types::chat::{ChatMessage, MessageRole};
use murmur_types::llm::{PromptMessage, PromptRole};
use murmur_types::personality::Personality;

/// Project one stored message to a prompt message, dropping usage metadata.
fn project(message: &ChatMessage) -> PromptMessage {
    let role = match message.role {
        MessageRole::User => PromptRole::User,
        MessageRole::Assistant => PromptRole::Assistant,
    };
    PromptMessage {
        role,
        content: message.content.clone(),
    }
}

/// Assemble the outgoing prompt from the post-append message history.
///
/// `history` must already include the user message being sent (it is the
/// last element). Personality memory only affects prompts assembled after
/// a toggle; this function reads the flag as it stands now.
pub fn assemble(history: &[ChatMessage], personality: Option<&Personality>) -> Vec<PromptMessage> {
    let projected: Vec<PromptMessage> = history.iter().map(project).collect();

    match personality {
        None => projected,
        Some(p) if p.has_memory => {
            let mut prompt = Vec::with_capacity(projected.len() + 1);
            prompt.push(PromptMessage::system(p.prompt.clone()));
            prompt.extend(projected);
            prompt
        }
        Some(p) => {
            let mut prompt = vec![PromptMessage::system(p.prompt.clone())];
            if let Some(current) = projected.last() {
                prompt.push(current.clone());
            }
            prompt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_types::chat::ChatId;
    use murmur_types::user::UserId;

    fn history() -> Vec<ChatMessage> {
        let chat_id = ChatId::new();
        let mut a1 = ChatMessage::assistant_placeholder(chat_id);
        a1.content = "a1".to_string();
        vec![
            ChatMessage::user(chat_id, "u1"),
            a1,
            ChatMessage::user(chat_id, "u2"),
        ]
    }

    fn personality(has_memory: bool) -> Personality {
        let mut p = Personality::new(UserId::new(), "P", "You are P.");
        p.is_active = true;
        p.has_memory = has_memory;
        p
    }

    #[test]
    fn test_no_personality_history_unchanged() {
        let prompt = assemble(&history(), None);
        assert_eq!(
            prompt,
            vec![
                PromptMessage::user("u1"),
                PromptMessage::assistant("a1"),
                PromptMessage::user("u2"),
            ]
        );
    }

    #[test]
    fn test_personality_with_memory_prepends_system() {
        let p = personality(true);
        let prompt = assemble(&history(), Some(&p));
        assert_eq!(
            prompt,
            vec![
                PromptMessage::system("You are P."),
                PromptMessage::user("u1"),
                PromptMessage::assistant("a1"),
                PromptMessage::user("u2"),
            ]
        );
    }

    #[test]
    fn test_personality_without_memory_keeps_only_current_message() {
        let p = personality(false);
        let prompt = assemble(&history(), Some(&p));
        assert_eq!(
            prompt,
            vec![
                PromptMessage::system("You are P."),
                PromptMessage::user("u2"),
            ]
        );
    }

    #[test]
    fn test_single_message_no_personality() {
        let chat_id = ChatId::new();
        let history = vec![ChatMessage::user(chat_id, "hello")];
        let prompt = assemble(&history, None);
        assert_eq!(prompt, vec![PromptMessage::user("hello")]);
    }

    #[test]
    fn test_projection_drops_usage_metadata() {
        let chat_id = ChatId::new();
        let mut msg = ChatMessage::assistant_placeholder(chat_id);
        msg.content = "answer".to_string();
        msg.usage = Some(murmur_types::llm::TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        });

        let prompt = assemble(&[msg], None);
        assert_eq!(prompt, vec![PromptMessage::assistant("answer")]);
    }
}
