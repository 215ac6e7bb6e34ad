//! CompletionClient trait definition.
//!
//! Uses RPITIT for `validate_api_key` and `Pin<Box<dyn Stream>>` for
//! `stream_chat` (streams need to be object-safe for the
//! BoxCompletionClient wrapper).

use std::pin::Pin;

use futures_util::Stream;

use murmur_types::llm::{CompletionError, GenerationParams, PromptMessage, StreamChunk};

/// A boxed, single-pass stream of completion chunks.
///
/// The stream owns everything it needs (`'static`) so the caller can keep
/// mutating its own state while draining it. Not restartable: each
/// `stream_chat` call opens a new upstream stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, CompletionError>> + Send>>;

/// Trait for streaming completion providers.
///
/// Implementations live in murmur-infra (e.g., `OpenAiCompletionClient`).
pub trait CompletionClient: Send + Sync {
    /// Configure or clear the active credential.
    ///
    /// The key is trimmed; a blank key leaves the client unconfigured.
    fn set_api_key(&mut self, key: &str);

    /// Whether a usable credential is currently configured.
    fn is_configured(&self) -> bool;

    /// Open a streaming completion for the given prompt.
    ///
    /// Yields content deltas in order. A usage snapshot rides on the chunk
    /// where the provider reported it; if it only arrives at stream end, a
    /// trailing chunk with empty content carries it. The first item is
    /// `Err(CompletionError::NotConfigured)` when no key is set -- no
    /// network I/O happens in that case.
    fn stream_chat(&self, messages: Vec<PromptMessage>, params: GenerationParams) -> ChunkStream;

    /// Check a key against the provider with a lightweight read-only call.
    ///
    /// All failures map to `false`. Never touches the client's own
    /// configured credential.
    fn validate_api_key(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = bool> + Send;
}
