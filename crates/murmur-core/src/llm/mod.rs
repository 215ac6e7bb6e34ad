//! Completion client contract.
//!
//! `CompletionClient` is the abstraction over streaming completion
//! providers; `BoxCompletionClient` erases the concrete type so the
//! session controller can hold any implementation.

pub mod box_client;
pub mod client;

pub use box_client::BoxCompletionClient;
pub use client::CompletionClient;
