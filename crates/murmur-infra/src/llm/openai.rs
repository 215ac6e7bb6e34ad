//! OpenAI-compatible completion client.
//!
//! Implements the `CompletionClient` trait from `murmur-core` using
//! [`async_openai`] for type-safe request handling and built-in SSE
//! streaming. Any OpenAI-compatible endpoint works via the configurable
//! base URL.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest,
};
use tracing::debug;

use murmur_core::llm::CompletionClient;
use murmur_core::llm::client::ChunkStream;
use murmur_types::llm::{CompletionError, GenerationParams, PromptMessage, PromptRole};

use super::streaming::map_completion_stream;

/// Default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Completion client for any OpenAI-compatible API.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`.
pub struct OpenAiCompletionClient {
    client: Option<Client<OpenAIConfig>>,
    base_url: String,
}

impl OpenAiCompletionClient {
    /// Create an unconfigured client against the OpenAI base URL.
    pub fn new() -> Self {
        Self::with_base_url(OPENAI_BASE_URL)
    }

    /// Create an unconfigured client against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: None,
            base_url: base_url.into(),
        }
    }

    fn make_client(&self, api_key: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&self.base_url);
        Client::with_config(config)
    }

    /// Build a [`CreateChatCompletionRequest`] from the prompt and
    /// generation parameters. System messages arrive already embedded in
    /// the prompt, so no separate system field is needed.
    fn build_request(
        messages: Vec<PromptMessage>,
        params: &GenerationParams,
    ) -> CreateChatCompletionRequest {
        let oai_messages: Vec<ChatCompletionRequestMessage> = messages
            .into_iter()
            .map(|msg| match msg.role {
                PromptRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(msg.content),
                        name: None,
                    })
                }
                PromptRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content),
                        name: None,
                    })
                }
                PromptRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content,
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            })
            .collect();

        CreateChatCompletionRequest {
            model: params.model.clone(),
            messages: oai_messages,
            max_completion_tokens: Some(params.max_tokens),
            temperature: Some(params.temperature as f32),
            stream: Some(true),
            stream_options: Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            }),
            ..Default::default()
        }
    }
}

impl Default for OpenAiCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionClient for OpenAiCompletionClient {
    fn set_api_key(&mut self, key: &str) {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            self.client = None;
        } else {
            self.client = Some(self.make_client(trimmed));
        }
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn stream_chat(&self, messages: Vec<PromptMessage>, params: GenerationParams) -> ChunkStream {
        let Some(client) = self.client.clone() else {
            return Box::pin(futures_util::stream::once(async {
                Err(CompletionError::NotConfigured)
            }));
        };

        debug!(model = %params.model, messages = messages.len(), "opening completion stream");
        let request = Self::build_request(messages, &params);

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_completion_stream(oai_stream);

            use futures_util::StreamExt;
            while let Some(chunk) = inner.next().await {
                yield chunk?;
            }
        })
    }

    async fn validate_api_key(&self, key: &str) -> bool {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return false;
        }
        // Lightweight read-only probe with a throwaway client; any failure
        // means "invalid" as far as the caller is concerned.
        let probe = self.make_client(trimmed);
        probe.models().list().await.is_ok()
    }
}

/// Map an `async_openai` error to a [`CompletionError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> CompletionError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => CompletionError::Provider(api_err.message.clone()),
        OpenAIError::StreamError(stream_err) => CompletionError::Stream(stream_err.to_string()),
        _ => CompletionError::Provider(err.to_string()),
    }
}
