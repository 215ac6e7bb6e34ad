//! Session orchestration.
//!
//! `SessionController` owns all in-memory application state and implements
//! the send-message pipeline: prompt assembly, streaming consumption,
//! incremental state updates, persistence, and error recovery.

pub mod controller;
pub mod prompt;
pub mod state;
pub mod title;

pub use controller::{SendGuard, SendOutcome, SessionController};
pub use state::SessionState;
