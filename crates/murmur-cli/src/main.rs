//! Murmur CLI entry point.
//!
//! Binary name: `murmur`
//!
//! Parses CLI arguments, initializes the database and session controller,
//! then dispatches to the appropriate command handler. Running with no
//! subcommand opens the interactive chat.

mod cli;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CreateResource, DeleteResource, EditResource, ListResource};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match args.verbose {
        0 if args.quiet => "error",
        0 => "warn",
        1 => "info,murmur=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let mut state = AppState::init().await?;

    match args.command.unwrap_or(Commands::Chat { chat: None }) {
        Commands::Chat { chat } => {
            cli::chat::run_chat(&mut state, chat.as_deref()).await?;
        }

        Commands::List { resource } => match resource {
            ListResource::Chats => {
                cli::chats::list_chats(&state, args.json)?;
            }
            ListResource::Personalities => {
                cli::personality::list_personalities(&state, args.json)?;
            }
        },

        Commands::Create { resource } => match resource {
            CreateResource::Personality {
                name,
                prompt,
                memory,
            } => {
                cli::personality::create_personality(&mut state, &name, &prompt, memory).await?;
            }
        },

        Commands::Edit { resource } => match resource {
            EditResource::Personality {
                name,
                rename,
                prompt,
                memory,
            } => {
                cli::personality::edit_personality(
                    &mut state,
                    &name,
                    rename.as_deref(),
                    prompt.as_deref(),
                    memory,
                )
                .await?;
            }
        },

        Commands::Activate { name } => {
            cli::personality::activate_personality(&mut state, &name).await?;
        }

        Commands::Delete { resource } => match resource {
            DeleteResource::Chat { id, force } => {
                cli::chats::delete_chat(&mut state, &id, force).await?;
            }
            DeleteResource::Personality { name, force } => {
                cli::personality::delete_personality(&mut state, &name, force).await?;
            }
        },

        Commands::Settings { action } => {
            cli::settings::run(&mut state, action, args.json).await?;
        }
    }

    Ok(())
}
