//! Chat listing and deletion commands.

use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use console::style;
use dialoguer::Confirm;

use murmur_types::chat::ChatId;

use crate::state::AppState;

/// Print the user's chats, newest-first.
pub fn list_chats(state: &AppState, json: bool) -> anyhow::Result<()> {
    let chats = state.controller.state().chats();

    if json {
        println!("{}", serde_json::to_string_pretty(chats)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!("\n  {}\n", style("No chats yet. Run `murmur` to start one.").dim());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Title", "Updated", "Id"]);
    for chat in chats {
        table.add_row(vec![
            chat.title.clone(),
            chat.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            chat.id.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Delete a chat after confirmation.
pub async fn delete_chat(state: &mut AppState, id: &str, force: bool) -> anyhow::Result<()> {
    let chat_id: ChatId = id
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid chat id '{id}': {e}"))?;

    let title = state
        .controller
        .state()
        .chats()
        .iter()
        .find(|c| c.id == chat_id)
        .map(|c| c.title.clone())
        .ok_or_else(|| anyhow::anyhow!("no chat with id {chat_id}"))?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete chat '{title}' and all its messages?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  {}", style("Cancelled.").dim());
            return Ok(());
        }
    }

    state.controller.delete_chat(chat_id).await?;
    println!("  {} Deleted '{title}'.", style("*").cyan().bold());
    Ok(())
}
