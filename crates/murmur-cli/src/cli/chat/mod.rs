//! Interactive chat loop.
//!
//! Reads lines, dispatches slash commands, and drives the controller's
//! send pipeline. Streamed fragments are printed by a subscriber task
//! listening on the controller's event bus, so the terminal renders
//! token-by-token while the controller owns the mutation.

pub mod commands;
pub mod input;

use std::io::Write;

use console::style;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use murmur_core::session::{SendGuard, SendOutcome};
use murmur_types::chat::ChatId;
use murmur_types::event::StateEvent;

use crate::state::AppState;

use commands::ChatCommand;
use input::{ChatInput, InputEvent};

/// Run the interactive chat loop, optionally resuming an existing chat.
pub async fn run_chat(state: &mut AppState, chat: Option<&str>) -> anyhow::Result<()> {
    if let Some(raw) = chat {
        let chat_id: ChatId = raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid chat id '{raw}': {e}"))?;
        state.controller.select_chat(chat_id).await?;
    }

    print_banner(state);

    let prompt = format!("  {} ", style("You >").green().bold());
    let mut chat_input =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!(
                    "\n  {}",
                    style("Press Ctrl+D to exit, or keep chatting.").dim()
                );
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(command) = commands::parse(&text) {
                    match command {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::Clear => chat_input.clear(),
                        ChatCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            break;
                        }
                        ChatCommand::New => {
                            let chat_id = state.controller.create_chat().await?;
                            state.controller.select_chat(chat_id).await?;
                            println!("\n  {} Started a new chat.\n", style("*").cyan().bold());
                        }
                        ChatCommand::History => print_history(state),
                        ChatCommand::Chats => print_chat_list(state),
                        ChatCommand::Unknown(name) => {
                            println!(
                                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                style("?").yellow().bold(),
                                style(name).dim()
                            );
                        }
                    }
                    continue;
                }

                send_and_render(state, &text).await;
            }
        }
    }

    Ok(())
}

/// Drive one send turn, rendering streamed output as it arrives.
async fn send_and_render(state: &mut AppState, text: &str) {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    // The printer task drains the event bus while send_message holds the
    // controller; it stops at GenerationFinished.
    let mut rx = state.controller.subscribe();
    let printer_spinner = spinner.clone();
    let printer = tokio::spawn(async move {
        let mut first_token = true;
        loop {
            match rx.recv().await {
                Ok(StateEvent::AssistantDelta { text, .. }) => {
                    if first_token {
                        printer_spinner.finish_and_clear();
                        print!("\n  ");
                        first_token = false;
                    }
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
                Ok(StateEvent::GenerationFinished { .. }) => {
                    if first_token {
                        printer_spinner.finish_and_clear();
                    }
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "terminal printer lagged behind event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = state.controller.send_message(text).await;

    match result {
        Ok(SendOutcome::Sent) => {
            let _ = printer.await;
            println!();
            print_stats_footer(state);
            println!();
        }
        Ok(SendOutcome::Ignored(guard)) => {
            // No generation happened, so the printer never sees a
            // GenerationFinished; stop it directly.
            printer.abort();
            spinner.finish_and_clear();
            match guard {
                SendGuard::EmptyInput => {}
                SendGuard::InFlight => {
                    println!(
                        "\n  {} A response is still being generated.\n",
                        style("!").yellow().bold()
                    );
                }
                SendGuard::Unconfigured => {
                    println!(
                        "\n  {} No API key configured. Add one with: {}\n",
                        style("!").yellow().bold(),
                        style("murmur settings set --api-key").cyan()
                    );
                }
                SendGuard::SignedOut => {
                    println!("\n  {} No user signed in.\n", style("!").red().bold());
                }
            }
        }
        Err(error) => {
            let _ = printer.await;
            println!(
                "\n  {} {error}\n  {}\n",
                style("!").red().bold(),
                style("Your message was kept. Try again or /exit to quit.").dim()
            );
        }
    }
}

fn print_banner(state: &AppState) {
    let settings = state.controller.state().settings();
    let model = settings.map(|s| s.model.as_str()).unwrap_or("(unknown)");
    let personality = state
        .controller
        .state()
        .active_personality()
        .map(|p| p.name.clone());

    println!();
    println!("  {}", style("murmur").cyan().bold());
    println!("  model: {}", style(model).dim());
    if let Some(name) = personality {
        println!("  personality: {}", style(name).dim());
    }
    if settings.is_none_or(|s| !s.has_api_key()) {
        println!(
            "  {} no API key set -- {}",
            style("!").yellow().bold(),
            style("murmur settings set --api-key").cyan()
        );
    }
    println!("  {}", style("Type /help for commands.").dim());
    println!();
}

fn print_history(state: &AppState) {
    let messages = state.controller.state().messages();
    if messages.is_empty() {
        println!("\n  {}\n", style("No messages yet.").dim());
        return;
    }

    println!();
    for message in messages {
        let label = match message.role {
            murmur_types::chat::MessageRole::User => style("You").green().bold(),
            murmur_types::chat::MessageRole::Assistant => style("Assistant").cyan().bold(),
        };
        let preview: String = if message.content.chars().count() > 100 {
            let head: String = message.content.chars().take(97).collect();
            format!("{head}...")
        } else {
            message.content.clone()
        };
        println!("  {label} {preview}");
    }
    println!();
}

fn print_chat_list(state: &AppState) {
    let chats = state.controller.state().chats();
    if chats.is_empty() {
        println!("\n  {}\n", style("No chats yet.").dim());
        return;
    }

    println!();
    for chat in chats {
        let marker = if state.controller.state().current_chat_id() == Some(chat.id) {
            style("*").cyan().bold().to_string()
        } else {
            " ".to_string()
        };
        println!("  {marker} {}  {}", chat.title, style(chat.id).dim());
    }
    println!();
}

fn print_stats_footer(state: &AppState) {
    let session_total = state.controller.state().total_tokens();
    let turn_usage = state
        .controller
        .state()
        .messages()
        .last()
        .and_then(|m| m.usage);

    match turn_usage {
        Some(usage) => println!(
            "  {}",
            style(format!(
                "{} tokens this turn · {session_total} this session",
                usage.total_tokens
            ))
            .dim()
        ),
        None => println!(
            "  {}",
            style(format!("{session_total} tokens this session")).dim()
        ),
    }
}
