//! Session controller orchestrating the send-message pipeline.
//!
//! `SessionController` is the single writer over `SessionState`: every
//! mutation goes through a `&mut self` method, and each one publishes a
//! `StateEvent` so front ends can re-render. The send path is optimistic
//! with rollback -- the assistant placeholder is staged in memory before
//! the first fragment arrives and removed again if the stream fails.

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use murmur_types::chat::{Chat, ChatId, ChatMessage, MessageId};
use murmur_types::error::{RepositoryError, SendError, SessionError, SettingsError};
use murmur_types::event::StateEvent;
use murmur_types::llm::{GenerationParams, PromptMessage};
use murmur_types::personality::{Personality, PersonalityId, PersonalityUpdate};
use murmur_types::settings::{SettingsUpdate, UserSettings};
use murmur_types::user::UserId;

use crate::event::EventBus;
use crate::llm::BoxCompletionClient;
use crate::store::{ChatRepository, PersonalityRepository, SettingsRepository};

use super::prompt;
use super::state::SessionState;
use super::title;

/// Result of a `send_message` call that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The full turn ran: user message appended, assistant streamed.
    Sent,
    /// A precondition failed; nothing was mutated.
    Ignored(SendGuard),
}

/// Which precondition turned a send into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendGuard {
    /// Input was empty or whitespace-only.
    EmptyInput,
    /// A send is already in flight for this session.
    InFlight,
    /// No usable API key is configured.
    Unconfigured,
    /// No user is signed in.
    SignedOut,
}

/// Orchestrates all session state: chats, messages, settings,
/// personalities, and the streaming send pipeline.
///
/// Generic over the repository traits so core stays free of
/// infrastructure; murmur-infra supplies the SQLite implementations and
/// the OpenAI completion client.
pub struct SessionController<C, S, P>
where
    C: ChatRepository,
    S: SettingsRepository,
    P: PersonalityRepository,
{
    chat_repo: C,
    settings_repo: S,
    personality_repo: P,
    client: BoxCompletionClient,
    state: SessionState,
    events: EventBus,
}

impl<C, S, P> SessionController<C, S, P>
where
    C: ChatRepository,
    S: SettingsRepository,
    P: PersonalityRepository,
{
    pub fn new(
        chat_repo: C,
        settings_repo: S,
        personality_repo: P,
        client: BoxCompletionClient,
    ) -> Self {
        Self {
            chat_repo,
            settings_repo,
            personality_repo,
            client,
            state: SessionState::default(),
            events: EventBus::default(),
        }
    }

    /// Read-only view of the session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Subscribe to state-change notifications.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Check a key against the provider without touching session state.
    pub async fn validate_api_key(&self, key: &str) -> bool {
        self.client.validate_api_key(key).await
    }

    // --- Auth boundary ---

    /// React to a session change from the authentication boundary.
    ///
    /// A user becoming available triggers loading of chats, settings
    /// (lazily created), and personalities; the user becoming `None`
    /// clears all user-scoped state.
    pub async fn set_user(&mut self, user: Option<UserId>) -> Result<(), RepositoryError> {
        self.state.user = user;
        self.events.publish(StateEvent::UserChanged);

        match user {
            Some(user_id) => {
                info!(user_id = %user_id, "user signed in, loading session data");
                self.load_chats().await?;
                self.load_settings().await?;
                self.load_personalities().await?;
            }
            None => {
                info!("user signed out, clearing session data");
                self.state.clear_user_data();
                self.client.set_api_key("");
                self.events.publish(StateEvent::ChatsChanged);
                self.events.publish(StateEvent::MessagesChanged);
                self.events.publish(StateEvent::SettingsChanged);
                self.events.publish(StateEvent::PersonalitiesChanged);
            }
        }
        Ok(())
    }

    // --- Chats ---

    /// Reload the user's chat list, newest-first.
    pub async fn load_chats(&mut self) -> Result<(), RepositoryError> {
        let Some(user_id) = self.state.user else {
            return Ok(());
        };
        self.state.chats = self.chat_repo.list_chats(&user_id).await?;
        self.events.publish(StateEvent::ChatsChanged);
        Ok(())
    }

    /// Create a chat with the default title and prepend it to the list.
    ///
    /// Does not change the current selection.
    pub async fn create_chat(&mut self) -> Result<ChatId, SessionError> {
        let user_id = self.state.user.ok_or(SessionError::SignedOut)?;
        let chat_id = self.create_chat_for(user_id).await?;
        Ok(chat_id)
    }

    async fn create_chat_for(&mut self, user_id: UserId) -> Result<ChatId, RepositoryError> {
        let chat = Chat::new(user_id);
        self.chat_repo.create_chat(&chat).await?;
        let chat_id = chat.id;
        self.state.chats.insert(0, chat);
        self.events.publish(StateEvent::ChatsChanged);
        Ok(chat_id)
    }

    /// Select a chat and load its messages in persisted order.
    pub async fn select_chat(&mut self, chat_id: ChatId) -> Result<(), RepositoryError> {
        self.state.current_chat_id = Some(chat_id);
        self.state.messages = self.chat_repo.list_messages(&chat_id).await?;
        self.events.publish(StateEvent::MessagesChanged);
        Ok(())
    }

    /// Delete a chat. Deleting the selected chat clears the selection and
    /// the in-memory message list.
    pub async fn delete_chat(&mut self, chat_id: ChatId) -> Result<(), RepositoryError> {
        self.chat_repo.delete_chat(&chat_id).await?;
        self.state.chats.retain(|c| c.id != chat_id);
        if self.state.current_chat_id == Some(chat_id) {
            self.state.current_chat_id = None;
            self.state.messages.clear();
            self.events.publish(StateEvent::MessagesChanged);
        }
        self.events.publish(StateEvent::ChatsChanged);
        Ok(())
    }

    /// Rename a chat in the store and in memory.
    pub async fn rename_chat(
        &mut self,
        chat_id: ChatId,
        title: &str,
    ) -> Result<(), RepositoryError> {
        self.chat_repo.rename_chat(&chat_id, title).await?;
        if let Some(chat) = self.state.chats.iter_mut().find(|c| c.id == chat_id) {
            chat.title = title.to_string();
        }
        self.events.publish(StateEvent::ChatsChanged);
        Ok(())
    }

    // --- Settings ---

    /// Load the user's settings, inserting a defaults row on first access.
    ///
    /// A stored API key is handed to the completion client immediately.
    pub async fn load_settings(&mut self) -> Result<(), RepositoryError> {
        let Some(user_id) = self.state.user else {
            return Ok(());
        };

        let settings = match self.settings_repo.get_settings(&user_id).await? {
            Some(settings) => settings,
            None => {
                let defaults = UserSettings::defaults(user_id);
                self.settings_repo.insert_settings(&defaults).await?;
                debug!(user_id = %user_id, "created default settings");
                defaults
            }
        };

        if let Some(key) = settings.api_key.as_deref() {
            self.client.set_api_key(key);
        }
        self.state.settings = Some(settings);
        self.events.publish(StateEvent::SettingsChanged);
        Ok(())
    }

    /// Apply a partial settings update.
    ///
    /// Bounds are validated before anything is written. A provided API key
    /// is trimmed; a blank key clears both the stored credential and the
    /// completion client.
    pub async fn update_settings(&mut self, update: SettingsUpdate) -> Result<(), SettingsError> {
        let Some(current) = self.state.settings.clone() else {
            return Ok(());
        };

        if let Some(temperature) = update.temperature {
            if !UserSettings::TEMPERATURE_RANGE.contains(&temperature) {
                return Err(SettingsError::TemperatureOutOfRange(temperature));
            }
        }
        if let Some(max_tokens) = update.max_tokens {
            if !UserSettings::MAX_TOKENS_RANGE.contains(&max_tokens) {
                return Err(SettingsError::MaxTokensOutOfRange(max_tokens));
            }
        }

        let mut settings = current;
        let key_update = update.api_key.map(|k| {
            let trimmed = k.trim().to_string();
            if trimmed.is_empty() { None } else { Some(trimmed) }
        });
        if let Some(ref key) = key_update {
            settings.api_key = key.clone();
        }
        if let Some(model) = update.model {
            settings.model = model;
        }
        if let Some(temperature) = update.temperature {
            settings.temperature = temperature;
        }
        if let Some(max_tokens) = update.max_tokens {
            settings.max_tokens = max_tokens;
        }
        if let Some(theme) = update.theme {
            settings.theme = theme;
        }
        settings.updated_at = chrono::Utc::now();

        self.settings_repo.update_settings(&settings).await?;

        if let Some(key) = key_update {
            self.client.set_api_key(key.as_deref().unwrap_or(""));
        }
        self.state.settings = Some(settings);
        self.events.publish(StateEvent::SettingsChanged);
        Ok(())
    }

    // --- Personalities ---

    /// Reload the user's personalities, newest-first.
    pub async fn load_personalities(&mut self) -> Result<(), RepositoryError> {
        let Some(user_id) = self.state.user else {
            return Ok(());
        };
        self.state.personalities = self.personality_repo.list_personalities(&user_id).await?;
        self.events.publish(StateEvent::PersonalitiesChanged);
        Ok(())
    }

    /// Create an inactive personality and prepend it to the list.
    pub async fn create_personality(
        &mut self,
        name: &str,
        prompt_text: &str,
    ) -> Result<PersonalityId, SessionError> {
        let user_id = self.state.user.ok_or(SessionError::SignedOut)?;
        let personality = Personality::new(user_id, name, prompt_text);
        self.personality_repo.create_personality(&personality).await?;
        let id = personality.id;
        self.state.personalities.insert(0, personality);
        self.events.publish(StateEvent::PersonalitiesChanged);
        Ok(id)
    }

    /// Apply a partial update to a personality.
    pub async fn update_personality(
        &mut self,
        personality_id: PersonalityId,
        update: PersonalityUpdate,
    ) -> Result<(), SessionError> {
        let Some(existing) = self
            .state
            .personalities
            .iter()
            .find(|p| p.id == personality_id)
            .cloned()
        else {
            return Err(SessionError::Repository(RepositoryError::NotFound));
        };

        let mut personality = existing;
        if let Some(name) = update.name {
            personality.name = name;
        }
        if let Some(prompt_text) = update.prompt {
            personality.prompt = prompt_text;
        }
        if let Some(has_memory) = update.has_memory {
            personality.has_memory = has_memory;
        }
        personality.updated_at = chrono::Utc::now();

        self.personality_repo.update_personality(&personality).await?;
        if let Some(slot) = self
            .state
            .personalities
            .iter_mut()
            .find(|p| p.id == personality_id)
        {
            *slot = personality;
        }
        self.events.publish(StateEvent::PersonalitiesChanged);
        Ok(())
    }

    /// Delete a personality. Deleting the active one leaves no active
    /// personality.
    pub async fn delete_personality(
        &mut self,
        personality_id: PersonalityId,
    ) -> Result<(), RepositoryError> {
        self.personality_repo.delete_personality(&personality_id).await?;
        self.state.personalities.retain(|p| p.id != personality_id);
        self.events.publish(StateEvent::PersonalitiesChanged);
        Ok(())
    }

    /// Activate one personality, deactivating all others.
    ///
    /// The repository performs deactivate-all-then-activate in a single
    /// transaction, so at most one personality is active even under
    /// concurrent toggles from other clients.
    pub async fn activate_personality(
        &mut self,
        personality_id: PersonalityId,
    ) -> Result<(), SessionError> {
        let user_id = self.state.user.ok_or(SessionError::SignedOut)?;
        self.personality_repo
            .activate_personality(&user_id, &personality_id)
            .await?;
        for p in &mut self.state.personalities {
            p.is_active = p.id == personality_id;
        }
        self.events.publish(StateEvent::PersonalitiesChanged);
        Ok(())
    }

    // --- Send pipeline ---

    /// Send a user message and stream the assistant's reply.
    ///
    /// Preconditions turn the call into a no-op (`Ignored`): blank input,
    /// a send already in flight, no signed-in user, or no usable API key.
    /// Any failure after the assistant placeholder was staged removes the
    /// placeholder, keeps the user message, and surfaces the error; the
    /// generation flag is cleared on every path.
    #[tracing::instrument(skip(self, content), fields(len = content.len()))]
    pub async fn send_message(&mut self, content: &str) -> Result<SendOutcome, SendError> {
        if content.trim().is_empty() {
            return Ok(SendOutcome::Ignored(SendGuard::EmptyInput));
        }
        if self.state.generating {
            debug!("send ignored: generation already in flight");
            return Ok(SendOutcome::Ignored(SendGuard::InFlight));
        }
        let Some(user_id) = self.state.user else {
            return Ok(SendOutcome::Ignored(SendGuard::SignedOut));
        };
        let Some((api_key, params)) = self.state.settings.as_ref().and_then(|s| {
            let key = s.api_key.as_deref()?.trim().to_string();
            if key.is_empty() {
                return None;
            }
            Some((
                key,
                GenerationParams {
                    model: s.model.clone(),
                    temperature: s.temperature,
                    max_tokens: s.max_tokens,
                },
            ))
        }) else {
            return Ok(SendOutcome::Ignored(SendGuard::Unconfigured));
        };

        // Resolve the target chat, creating and selecting one if needed.
        let chat_id = match self.state.current_chat_id {
            Some(id) => id,
            None => {
                let id = self.create_chat_for(user_id).await?;
                self.state.current_chat_id = Some(id);
                id
            }
        };

        // Optimistically append the user message, then persist best-effort:
        // a failed write is logged, not retried, and never blocks the turn.
        let user_message = ChatMessage::user(chat_id, content);
        self.state.messages.push(user_message.clone());
        self.events.publish(StateEvent::MessagesChanged);
        if let Err(error) = self.chat_repo.save_message(&user_message).await {
            warn!(chat_id = %chat_id, error = %error, "failed to persist user message");
        }

        let prompt = prompt::assemble(&self.state.messages, self.state.active_personality());

        // Enter `sending`: stage the placeholder before the first fragment
        // so the UI has a stable target to update.
        self.state.generating = true;
        self.events.publish(StateEvent::GenerationStarted { chat_id });
        let placeholder = ChatMessage::assistant_placeholder(chat_id);
        let placeholder_id = placeholder.id;
        self.state.messages.push(placeholder);
        self.events.publish(StateEvent::MessagesChanged);

        let result = self.consume_stream(placeholder_id, &api_key, prompt, params).await;

        match &result {
            Ok(()) => {
                self.finish_turn(chat_id, placeholder_id, content).await;
            }
            Err(error) => {
                // Roll back the optimistic placeholder; the user message
                // stays, already persisted or pending.
                self.state.messages.retain(|m| m.id != placeholder_id);
                self.events.publish(StateEvent::MessagesChanged);
                warn!(chat_id = %chat_id, error = %error, "send aborted, placeholder rolled back");
            }
        }

        self.state.generating = false;
        self.events.publish(StateEvent::GenerationFinished { chat_id });

        result.map(|()| SendOutcome::Sent)
    }

    /// Drain the completion stream into the placeholder message.
    async fn consume_stream(
        &mut self,
        placeholder_id: MessageId,
        api_key: &str,
        prompt: Vec<PromptMessage>,
        params: GenerationParams,
    ) -> Result<(), SendError> {
        self.client.set_api_key(api_key);

        let mut stream = self.client.stream_chat(prompt, params);
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;

            if !chunk.content.is_empty() {
                buffer.push_str(&chunk.content);
                let chat_id = if let Some(message) = self
                    .state
                    .messages
                    .iter_mut()
                    .find(|m| m.id == placeholder_id)
                {
                    message.content.clone_from(&buffer);
                    Some(message.chat_id)
                } else {
                    None
                };
                if let Some(chat_id) = chat_id {
                    self.events.publish(StateEvent::AssistantDelta {
                        chat_id,
                        text: chunk.content,
                    });
                }
            }

            if let Some(usage) = chunk.usage {
                self.state.total_tokens += u64::from(usage.total_tokens);
                if let Some(message) = self
                    .state
                    .messages
                    .iter_mut()
                    .find(|m| m.id == placeholder_id)
                {
                    message.usage = Some(usage);
                }
                self.events.publish(StateEvent::MessagesChanged);
            }
        }

        Ok(())
    }

    /// Persist the finished assistant message and derive the title after
    /// the first exchange. Both writes are best-effort.
    async fn finish_turn(&mut self, chat_id: ChatId, placeholder_id: MessageId, sent_text: &str) {
        if let Some(assistant) = self
            .state
            .messages
            .iter()
            .find(|m| m.id == placeholder_id)
            .cloned()
        {
            if let Err(error) = self.chat_repo.save_message(&assistant).await {
                warn!(chat_id = %chat_id, error = %error, "failed to persist assistant message");
            }
        }

        if self.state.messages.len() == 2 {
            let derived = title::derive_title(sent_text);
            if let Err(error) = self.rename_chat(chat_id, &derived).await {
                warn!(chat_id = %chat_id, error = %error, "failed to update derived chat title");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use murmur_types::chat::MessageRole;
    use murmur_types::llm::{CompletionError, PromptRole, StreamChunk, TokenUsage};
    use murmur_types::settings::Theme;

    use crate::llm::CompletionClient;

    // --- In-memory repositories ---

    #[derive(Default)]
    struct ChatStoreInner {
        chats: Vec<Chat>,
        messages: Vec<ChatMessage>,
        fail_saves: bool,
    }

    #[derive(Clone, Default)]
    struct MemChatRepo {
        inner: Arc<Mutex<ChatStoreInner>>,
    }

    impl ChatRepository for MemChatRepo {
        async fn create_chat(&self, chat: &Chat) -> Result<(), RepositoryError> {
            self.inner.lock().unwrap().chats.push(chat.clone());
            Ok(())
        }

        async fn get_chat(&self, chat_id: &ChatId) -> Result<Option<Chat>, RepositoryError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .chats
                .iter()
                .find(|c| c.id == *chat_id)
                .cloned())
        }

        async fn list_chats(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
            let mut chats: Vec<Chat> = self
                .inner
                .lock()
                .unwrap()
                .chats
                .iter()
                .filter(|c| c.user_id == *user_id)
                .cloned()
                .collect();
            chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(chats)
        }

        async fn rename_chat(&self, chat_id: &ChatId, title: &str) -> Result<(), RepositoryError> {
            let mut inner = self.inner.lock().unwrap();
            let chat = inner
                .chats
                .iter_mut()
                .find(|c| c.id == *chat_id)
                .ok_or(RepositoryError::NotFound)?;
            chat.title = title.to_string();
            chat.updated_at = chrono::Utc::now();
            Ok(())
        }

        async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), RepositoryError> {
            let mut inner = self.inner.lock().unwrap();
            inner.chats.retain(|c| c.id != *chat_id);
            inner.messages.retain(|m| m.chat_id != *chat_id);
            Ok(())
        }

        async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_saves {
                return Err(RepositoryError::Connection);
            }
            inner.messages.push(message.clone());
            Ok(())
        }

        async fn list_messages(
            &self,
            chat_id: &ChatId,
        ) -> Result<Vec<ChatMessage>, RepositoryError> {
            let mut messages: Vec<ChatMessage> = self
                .inner
                .lock()
                .unwrap()
                .messages
                .iter()
                .filter(|m| m.chat_id == *chat_id)
                .cloned()
                .collect();
            messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(messages)
        }

        async fn count_messages(&self, chat_id: &ChatId) -> Result<u32, RepositoryError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .messages
                .iter()
                .filter(|m| m.chat_id == *chat_id)
                .count() as u32)
        }
    }

    #[derive(Clone, Default)]
    struct MemSettingsRepo {
        inner: Arc<Mutex<Vec<UserSettings>>>,
    }

    impl SettingsRepository for MemSettingsRepo {
        async fn get_settings(
            &self,
            user_id: &UserId,
        ) -> Result<Option<UserSettings>, RepositoryError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.user_id == *user_id)
                .cloned())
        }

        async fn insert_settings(&self, settings: &UserSettings) -> Result<(), RepositoryError> {
            let mut rows = self.inner.lock().unwrap();
            if rows.iter().any(|s| s.user_id == settings.user_id) {
                return Err(RepositoryError::Conflict("settings row exists".to_string()));
            }
            rows.push(settings.clone());
            Ok(())
        }

        async fn update_settings(&self, settings: &UserSettings) -> Result<(), RepositoryError> {
            let mut rows = self.inner.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|s| s.user_id == settings.user_id)
                .ok_or(RepositoryError::NotFound)?;
            *row = settings.clone();
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemPersonalityRepo {
        inner: Arc<Mutex<Vec<Personality>>>,
    }

    impl PersonalityRepository for MemPersonalityRepo {
        async fn create_personality(
            &self,
            personality: &Personality,
        ) -> Result<(), RepositoryError> {
            self.inner.lock().unwrap().push(personality.clone());
            Ok(())
        }

        async fn list_personalities(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<Personality>, RepositoryError> {
            let mut rows: Vec<Personality> = self
                .inner
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.user_id == *user_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn update_personality(
            &self,
            personality: &Personality,
        ) -> Result<(), RepositoryError> {
            let mut rows = self.inner.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|p| p.id == personality.id)
                .ok_or(RepositoryError::NotFound)?;
            *row = personality.clone();
            Ok(())
        }

        async fn delete_personality(
            &self,
            personality_id: &PersonalityId,
        ) -> Result<(), RepositoryError> {
            self.inner.lock().unwrap().retain(|p| p.id != *personality_id);
            Ok(())
        }

        async fn activate_personality(
            &self,
            user_id: &UserId,
            personality_id: &PersonalityId,
        ) -> Result<(), RepositoryError> {
            let mut rows = self.inner.lock().unwrap();
            for p in rows.iter_mut().filter(|p| p.user_id == *user_id) {
                p.is_active = false;
            }
            let target = rows
                .iter_mut()
                .find(|p| p.id == *personality_id)
                .ok_or(RepositoryError::NotFound)?;
            target.is_active = true;
            Ok(())
        }
    }

    // --- Scripted completion client ---

    type ScriptedResponse = Vec<Result<StreamChunk, CompletionError>>;

    #[derive(Clone, Default)]
    struct ScriptedClient {
        configured: bool,
        responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
        prompts: Arc<Mutex<Vec<Vec<PromptMessage>>>>,
        params: Arc<Mutex<Vec<GenerationParams>>>,
    }

    impl ScriptedClient {
        fn push_response(&self, response: ScriptedResponse) {
            self.responses.lock().unwrap().push_back(response);
        }
    }

    impl CompletionClient for ScriptedClient {
        fn set_api_key(&mut self, key: &str) {
            self.configured = !key.trim().is_empty();
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        fn stream_chat(
            &self,
            messages: Vec<PromptMessage>,
            params: GenerationParams,
        ) -> crate::llm::client::ChunkStream {
            self.prompts.lock().unwrap().push(messages);
            self.params.lock().unwrap().push(params);
            let items = self.responses.lock().unwrap().pop_front().unwrap_or_default();
            Box::pin(futures_util::stream::iter(items))
        }

        async fn validate_api_key(&self, key: &str) -> bool {
            !key.trim().is_empty()
        }
    }

    // --- Harness ---

    struct Harness {
        controller: SessionController<MemChatRepo, MemSettingsRepo, MemPersonalityRepo>,
        chat_repo: MemChatRepo,
        client: ScriptedClient,
    }

    async fn harness() -> Harness {
        let chat_repo = MemChatRepo::default();
        let settings_repo = MemSettingsRepo::default();
        let personality_repo = MemPersonalityRepo::default();
        let client = ScriptedClient::default();
        let mut controller = SessionController::new(
            chat_repo.clone(),
            settings_repo,
            personality_repo,
            BoxCompletionClient::new(client.clone()),
        );
        controller.set_user(Some(UserId::new())).await.unwrap();
        Harness {
            controller,
            chat_repo,
            client,
        }
    }

    async fn harness_with_key() -> Harness {
        let mut h = harness().await;
        h.controller
            .update_settings(SettingsUpdate {
                api_key: Some("sk-test".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        h
    }

    fn reply(chunks: &[&str]) -> ScriptedResponse {
        chunks.iter().map(|c| Ok(StreamChunk::text(*c))).collect()
    }

    fn reply_with_usage(chunks: &[&str], total: u32) -> ScriptedResponse {
        let mut items = reply(chunks);
        items.push(Ok(StreamChunk::usage(TokenUsage {
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        })));
        items
    }

    // --- Guards ---

    #[tokio::test]
    async fn send_whitespace_input_is_noop() {
        let mut h = harness_with_key().await;
        let outcome = h.controller.send_message("   \n\t").await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored(SendGuard::EmptyInput));
        assert!(h.controller.state().messages().is_empty());
        assert!(h.client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_while_generating_is_noop() {
        let mut h = harness_with_key().await;
        h.controller.state.generating = true;
        let outcome = h.controller.send_message("hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored(SendGuard::InFlight));
        assert!(h.controller.state().messages().is_empty());
    }

    #[tokio::test]
    async fn send_without_api_key_is_noop() {
        let mut h = harness().await;
        let outcome = h.controller.send_message("hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored(SendGuard::Unconfigured));
        assert!(h.controller.state().messages().is_empty());
    }

    #[tokio::test]
    async fn send_signed_out_is_noop() {
        let mut h = harness_with_key().await;
        h.controller.set_user(None).await.unwrap();
        let outcome = h.controller.send_message("hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored(SendGuard::SignedOut));
    }

    // --- Happy path ---

    #[tokio::test]
    async fn first_send_creates_and_selects_chat() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["Hi there!"]));

        assert!(h.controller.state().current_chat_id().is_none());
        let outcome = h.controller.send_message("hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Sent);

        let chat_id = h.controller.state().current_chat_id().unwrap();
        assert_eq!(h.controller.state().chats().len(), 1);
        assert_eq!(h.controller.state().chats()[0].id, chat_id);
        assert!(!h.controller.state().is_generating());
    }

    #[tokio::test]
    async fn streaming_appends_fragments_and_persists_both_sides() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["Hel", "lo ", "world"]));

        h.controller.send_message("greet me").await.unwrap();

        let messages = h.controller.state().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "greet me");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Hello world");

        let stored = h.chat_repo.inner.lock().unwrap().messages.clone();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "greet me");
        assert_eq!(stored[1].content, "Hello world");
    }

    #[tokio::test]
    async fn send_uses_configured_generation_params() {
        let mut h = harness_with_key().await;
        h.controller
            .update_settings(SettingsUpdate {
                model: Some("gpt-4o-mini".to_string()),
                temperature: Some(1.2),
                max_tokens: Some(500),
                ..Default::default()
            })
            .await
            .unwrap();
        h.client.push_response(reply(&["ok"]));

        h.controller.send_message("hello").await.unwrap();

        let params = h.client.params.lock().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].model, "gpt-4o-mini");
        assert!((params[0].temperature - 1.2).abs() < f64::EPSILON);
        assert_eq!(params[0].max_tokens, 500);
    }

    // --- Prompt assembly ---

    async fn seeded_history(h: &mut Harness) -> ChatId {
        let chat_id = h.controller.create_chat().await.unwrap();
        h.controller.select_chat(chat_id).await.unwrap();
        let mut a1 = ChatMessage::assistant_placeholder(chat_id);
        a1.content = "a1".to_string();
        h.controller.state.messages = vec![ChatMessage::user(chat_id, "u1"), a1];
        chat_id
    }

    #[tokio::test]
    async fn prompt_without_personality_is_projected_history() {
        let mut h = harness_with_key().await;
        seeded_history(&mut h).await;
        h.client.push_response(reply(&["a2"]));

        h.controller.send_message("u2").await.unwrap();

        let prompts = h.client.prompts.lock().unwrap();
        let contents: Vec<(PromptRole, &str)> = prompts[0]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![
                (PromptRole::User, "u1"),
                (PromptRole::Assistant, "a1"),
                (PromptRole::User, "u2"),
            ]
        );
    }

    #[tokio::test]
    async fn prompt_with_memory_personality_prepends_system() {
        let mut h = harness_with_key().await;
        seeded_history(&mut h).await;
        let id = h.controller.create_personality("P", "be P").await.unwrap();
        h.controller
            .update_personality(id, PersonalityUpdate {
                has_memory: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        h.controller.activate_personality(id).await.unwrap();
        h.client.push_response(reply(&["a2"]));

        h.controller.send_message("u2").await.unwrap();

        let prompts = h.client.prompts.lock().unwrap();
        let contents: Vec<(PromptRole, &str)> = prompts[0]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![
                (PromptRole::System, "be P"),
                (PromptRole::User, "u1"),
                (PromptRole::Assistant, "a1"),
                (PromptRole::User, "u2"),
            ]
        );
    }

    #[tokio::test]
    async fn prompt_without_memory_personality_drops_history() {
        let mut h = harness_with_key().await;
        seeded_history(&mut h).await;
        let id = h.controller.create_personality("P", "be P").await.unwrap();
        h.controller.activate_personality(id).await.unwrap();
        h.client.push_response(reply(&["a2"]));

        h.controller.send_message("u2").await.unwrap();

        let prompts = h.client.prompts.lock().unwrap();
        let contents: Vec<(PromptRole, &str)> = prompts[0]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![(PromptRole::System, "be P"), (PromptRole::User, "u2")]
        );
    }

    // --- Title derivation ---

    #[tokio::test]
    async fn title_derived_after_first_exchange_long_message() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["reply"]));

        let message = "m".repeat(60);
        h.controller.send_message(&message).await.unwrap();

        let expected = format!("{}...", "m".repeat(50));
        assert_eq!(h.controller.state().chats()[0].title, expected);
        let stored = h.chat_repo.inner.lock().unwrap().chats[0].title.clone();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn title_derived_after_first_exchange_short_message() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["reply"]));

        let message = "n".repeat(30);
        h.controller.send_message(&message).await.unwrap();

        assert_eq!(h.controller.state().chats()[0].title, message);
    }

    #[tokio::test]
    async fn title_not_rederived_after_later_exchanges() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["first reply"]));
        h.client.push_response(reply(&["second reply"]));

        h.controller.send_message("first message").await.unwrap();
        h.controller.send_message("a different second message").await.unwrap();

        assert_eq!(h.controller.state().chats()[0].title, "first message");
    }

    // --- Failure handling ---

    #[tokio::test]
    async fn provider_error_rolls_back_placeholder() {
        let mut h = harness_with_key().await;
        h.client.push_response(vec![
            Ok(StreamChunk::text("partial")),
            Err(CompletionError::Provider("boom".to_string())),
        ]);

        let result = h.controller.send_message("hello").await;
        assert!(result.is_err());

        let messages = h.controller.state().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "hello");
        assert!(!h.controller.state().is_generating());

        // No partial assistant row was persisted.
        let stored = h.chat_repo.inner.lock().unwrap().messages.clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn failed_user_message_write_does_not_block_turn() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["still replied"]));
        h.chat_repo.inner.lock().unwrap().fail_saves = true;

        let outcome = h.controller.send_message("hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Sent);
        assert_eq!(h.controller.state().messages().len(), 2);
        assert_eq!(h.controller.state().messages()[1].content, "still replied");
    }

    // --- Usage accumulation ---

    #[tokio::test]
    async fn usage_accumulates_across_turns() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply_with_usage(&["one"], 100));
        h.client.push_response(reply_with_usage(&["two"], 150));

        h.controller.send_message("first").await.unwrap();
        assert_eq!(h.controller.state().total_tokens(), 100);

        h.controller.send_message("second").await.unwrap();
        assert_eq!(h.controller.state().total_tokens(), 250);
    }

    #[tokio::test]
    async fn usage_snapshot_attached_to_assistant_message() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply_with_usage(&["answer"], 42));

        h.controller.send_message("question").await.unwrap();

        let assistant = &h.controller.state().messages()[1];
        let usage = assistant.usage.unwrap();
        assert_eq!(usage.total_tokens, 42);
    }

    // --- Personalities ---

    #[tokio::test]
    async fn activating_personality_is_mutually_exclusive() {
        let mut h = harness().await;
        let a = h.controller.create_personality("A", "be A").await.unwrap();
        let b = h.controller.create_personality("B", "be B").await.unwrap();

        h.controller.activate_personality(a).await.unwrap();
        h.controller.activate_personality(b).await.unwrap();

        let active: Vec<&Personality> = h
            .controller
            .state()
            .personalities()
            .iter()
            .filter(|p| p.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b);

        // The store agrees after a reload.
        h.controller.load_personalities().await.unwrap();
        let active = h.controller.state().active_personality().unwrap();
        assert_eq!(active.id, b);
    }

    #[tokio::test]
    async fn deleting_active_personality_clears_active() {
        let mut h = harness().await;
        let a = h.controller.create_personality("A", "be A").await.unwrap();
        h.controller.activate_personality(a).await.unwrap();

        h.controller.delete_personality(a).await.unwrap();
        assert!(h.controller.state().active_personality().is_none());
    }

    // --- Auth boundary / chats ---

    #[tokio::test]
    async fn sign_out_clears_user_scoped_state() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["reply"]));
        h.controller.send_message("hello").await.unwrap();
        h.controller.create_personality("A", "be A").await.unwrap();

        h.controller.set_user(None).await.unwrap();

        let state = h.controller.state();
        assert!(state.user().is_none());
        assert!(state.chats().is_empty());
        assert!(state.current_chat_id().is_none());
        assert!(state.messages().is_empty());
        assert!(state.settings().is_none());
        assert!(state.personalities().is_empty());
    }

    #[tokio::test]
    async fn deleting_selected_chat_clears_selection_and_messages() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["reply"]));
        h.controller.send_message("hello").await.unwrap();

        let chat_id = h.controller.state().current_chat_id().unwrap();
        h.controller.delete_chat(chat_id).await.unwrap();

        assert!(h.controller.state().current_chat_id().is_none());
        assert!(h.controller.state().messages().is_empty());
        assert!(h.controller.state().chats().is_empty());
    }

    #[tokio::test]
    async fn select_chat_loads_persisted_order() {
        let mut h = harness_with_key().await;
        h.client.push_response(reply(&["reply"]));
        h.controller.send_message("hello").await.unwrap();
        let chat_id = h.controller.state().current_chat_id().unwrap();

        // Selecting another chat and back reloads from the store.
        let other = h.controller.create_chat().await.unwrap();
        h.controller.select_chat(other).await.unwrap();
        assert!(h.controller.state().messages().is_empty());

        h.controller.select_chat(chat_id).await.unwrap();
        let messages = h.controller.state().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    // --- Settings ---

    #[tokio::test]
    async fn settings_lazily_created_once() {
        let mut h = harness().await;
        let first_id = h.controller.state().settings().unwrap().id;

        h.controller.load_settings().await.unwrap();
        let second_id = h.controller.state().settings().unwrap().id;
        assert_eq!(first_id, second_id);
    }

    #[tokio::test]
    async fn update_settings_rejects_out_of_range_values() {
        let mut h = harness().await;

        let err = h
            .controller
            .update_settings(SettingsUpdate {
                temperature: Some(2.5),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::TemperatureOutOfRange(_)));

        let err = h
            .controller
            .update_settings(SettingsUpdate {
                max_tokens: Some(50),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::MaxTokensOutOfRange(_)));
    }

    #[tokio::test]
    async fn blank_api_key_clears_credential() {
        let mut h = harness_with_key().await;
        h.controller
            .update_settings(SettingsUpdate {
                api_key: Some("   ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(h.controller.state().settings().unwrap().api_key.is_none());
        let outcome = h.controller.send_message("hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored(SendGuard::Unconfigured));
    }

    #[tokio::test]
    async fn update_settings_persists_theme() {
        let mut h = harness().await;
        h.controller
            .update_settings(SettingsUpdate {
                theme: Some(Theme::Dark),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(h.controller.state().settings().unwrap().theme, Theme::Dark);
    }
}
