//! Completion client implementations.
//!
//! Contains the concrete implementation of the [`CompletionClient`] trait
//! defined in `murmur-core`, built on `async_openai`. Any
//! OpenAI-compatible endpoint works via a configurable base URL.
//!
//! [`CompletionClient`]: murmur_core::llm::CompletionClient

pub mod openai;
pub mod streaming;

pub use openai::OpenAiCompletionClient;
