//! CLI argument definitions and command handlers.

pub mod chat;
pub mod chats;
pub mod personality;
pub mod settings;

use clap::{Parser, Subcommand};

/// Murmur -- a streaming chat client for OpenAI-compatible APIs.
#[derive(Parser)]
#[command(name = "murmur", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit machine-readable JSON where supported
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive chat (default)
    Chat {
        /// Resume an existing chat by id
        #[arg(long)]
        chat: Option<String>,
    },

    /// List stored resources
    List {
        #[command(subcommand)]
        resource: ListResource,
    },

    /// Create a resource
    Create {
        #[command(subcommand)]
        resource: CreateResource,
    },

    /// Edit a resource
    Edit {
        #[command(subcommand)]
        resource: EditResource,
    },

    /// Activate a personality by name
    Activate {
        /// Personality name
        name: String,
    },

    /// Delete a resource
    Delete {
        #[command(subcommand)]
        resource: DeleteResource,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
pub enum ListResource {
    /// List chats, newest-first
    Chats,
    /// List personalities, newest-first
    Personalities,
}

#[derive(Subcommand)]
pub enum CreateResource {
    /// Create a new personality
    Personality {
        /// Display name
        name: String,
        /// System prompt text
        #[arg(short, long)]
        prompt: String,
        /// Include full conversation history in prompts
        #[arg(long)]
        memory: bool,
    },
}

#[derive(Subcommand)]
pub enum EditResource {
    /// Edit an existing personality
    Personality {
        /// Current name
        name: String,
        /// New display name
        #[arg(long)]
        rename: Option<String>,
        /// Replace the system prompt text
        #[arg(short, long)]
        prompt: Option<String>,
        /// Turn conversation memory on or off
        #[arg(long)]
        memory: Option<bool>,
    },
}

#[derive(Subcommand)]
pub enum DeleteResource {
    /// Delete a chat and its messages
    Chat {
        /// Chat id
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Delete a personality
    Personality {
        /// Personality name
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        /// Set the API key (prompts securely when no value is given)
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        api_key: Option<String>,
        /// Model identifier
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature (0.0-2.0)
        #[arg(long)]
        temperature: Option<f64>,
        /// Maximum output tokens (100-4000)
        #[arg(long)]
        max_tokens: Option<u32>,
        /// UI theme: light or dark
        #[arg(long)]
        theme: Option<String>,
    },
    /// Check the configured (or a given) API key against the provider
    Validate {
        /// Key to check; defaults to the stored key
        key: Option<String>,
    },
}
