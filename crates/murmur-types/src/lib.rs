//! Shared domain types for Murmur.
//!
//! This crate contains the core domain types used across the Murmur chat
//! engine: chats, messages, settings, personalities, prompt/stream shapes,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod error;
pub mod event;
pub mod llm;
pub mod personality;
pub mod settings;
pub mod user;
