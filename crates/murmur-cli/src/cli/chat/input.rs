//! Line input for the chat loop.
//!
//! `rustyline_async` keeps the prompt cooperative with tokio: reads
//! suspend instead of blocking the runtime, so spinners and streamed
//! output keep rendering while the prompt waits.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent};

/// What the user did at the prompt.
#[derive(Debug)]
pub enum InputEvent {
    /// A submitted line, trimmed.
    Message(String),
    /// Ctrl+D.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

/// Async line editor for the chat prompt.
pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    pub fn new(prompt: String) -> Result<Self, ReadlineError> {
        // The shared writer half goes unused: streamed output is printed
        // between reads, never while the prompt is live.
        let (rl, _writer) = Readline::new(prompt)?;
        Ok(Self { rl })
    }

    /// Wait for the next line, EOF, or interrupt.
    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => InputEvent::Message(line.trim().to_string()),
            Ok(ReadlineEvent::Eof) | Err(_) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
        }
    }

    /// Clear the terminal screen.
    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }
}
