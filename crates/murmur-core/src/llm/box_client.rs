//! BoxCompletionClient -- object-safe dynamic dispatch wrapper for
//! CompletionClient.
//!
//! 1. Define an object-safe `CompletionClientDyn` trait with boxed futures
//! 2. Blanket-impl `CompletionClientDyn` for all `T: CompletionClient`
//! 3. `BoxCompletionClient` wraps `Box<dyn CompletionClientDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use murmur_types::llm::{GenerationParams, PromptMessage};

use super::client::{ChunkStream, CompletionClient};

/// Object-safe version of [`CompletionClient`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch. A blanket
/// implementation is provided for all types implementing
/// `CompletionClient`.
pub trait CompletionClientDyn: Send + Sync {
    fn set_api_key(&mut self, key: &str);

    fn is_configured(&self) -> bool;

    fn stream_chat(&self, messages: Vec<PromptMessage>, params: GenerationParams) -> ChunkStream;

    fn validate_api_key_boxed<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

/// Blanket implementation: any `CompletionClient` automatically implements
/// `CompletionClientDyn`.
impl<T: CompletionClient> CompletionClientDyn for T {
    fn set_api_key(&mut self, key: &str) {
        CompletionClient::set_api_key(self, key)
    }

    fn is_configured(&self) -> bool {
        CompletionClient::is_configured(self)
    }

    fn stream_chat(&self, messages: Vec<PromptMessage>, params: GenerationParams) -> ChunkStream {
        CompletionClient::stream_chat(self, messages, params)
    }

    fn validate_api_key_boxed<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(self.validate_api_key(key))
    }
}

/// Type-erased completion client.
///
/// Since `CompletionClient` uses RPITIT it cannot be a trait object
/// directly; `BoxCompletionClient` provides equivalent methods delegating
/// to the inner `CompletionClientDyn` trait object.
pub struct BoxCompletionClient {
    inner: Box<dyn CompletionClientDyn + Send + Sync>,
}

impl BoxCompletionClient {
    /// Wrap a concrete `CompletionClient` in a type-erased box.
    pub fn new<T: CompletionClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    /// Configure or clear the active credential.
    pub fn set_api_key(&mut self, key: &str) {
        self.inner.set_api_key(key)
    }

    /// Whether a usable credential is currently configured.
    pub fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    /// Open a streaming completion for the given prompt.
    pub fn stream_chat(
        &self,
        messages: Vec<PromptMessage>,
        params: GenerationParams,
    ) -> ChunkStream {
        self.inner.stream_chat(messages, params)
    }

    /// Check a key against the provider; all failures map to `false`.
    pub async fn validate_api_key(&self, key: &str) -> bool {
        self.inner.validate_api_key_boxed(key).await
    }
}
