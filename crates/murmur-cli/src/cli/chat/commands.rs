//! Slash commands available inside the chat loop.

use console::style;

/// A parsed slash command.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    New,
    History,
    Chats,
    Clear,
    Exit,
    Unknown(String),
}

/// Parse a slash command from an input line, if it is one.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let command = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_lowercase();
    Some(match command.as_str() {
        "/help" => ChatCommand::Help,
        "/new" => ChatCommand::New,
        "/history" => ChatCommand::History,
        "/chats" => ChatCommand::Chats,
        "/clear" => ChatCommand::Clear,
        "/exit" | "/quit" => ChatCommand::Exit,
        other => ChatCommand::Unknown(other.to_string()),
    })
}

/// Print the in-chat help text.
pub fn print_help() {
    println!();
    println!("  {}", style("Commands").bold());
    println!("  /new       start a new chat");
    println!("  /history   show this chat's messages");
    println!("  /chats     list your chats");
    println!("  /clear     clear the screen");
    println!("  /exit      leave the chat (Ctrl+D also works)");
    println!();
}
