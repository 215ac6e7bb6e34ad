//! Personality management commands.

use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use console::style;
use dialoguer::Confirm;

use murmur_types::personality::{PersonalityId, PersonalityUpdate};

use crate::state::AppState;

/// Find a personality id by case-insensitive name.
fn find_by_name(state: &AppState, name: &str) -> anyhow::Result<PersonalityId> {
    state
        .controller
        .state()
        .personalities()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .map(|p| p.id)
        .ok_or_else(|| anyhow::anyhow!("no personality named '{name}'"))
}

/// Print the user's personalities, newest-first.
pub fn list_personalities(state: &AppState, json: bool) -> anyhow::Result<()> {
    let personalities = state.controller.state().personalities();

    if json {
        println!("{}", serde_json::to_string_pretty(personalities)?);
        return Ok(());
    }

    if personalities.is_empty() {
        println!(
            "\n  {}\n",
            style("No personalities yet. Create one with `murmur create personality`.").dim()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Active", "Memory", "Prompt"]);
    for p in personalities {
        let prompt_preview: String = if p.prompt.chars().count() > 60 {
            let head: String = p.prompt.chars().take(57).collect();
            format!("{head}...")
        } else {
            p.prompt.clone()
        };
        table.add_row(vec![
            p.name.clone(),
            if p.is_active { "yes" } else { "" }.to_string(),
            if p.has_memory { "yes" } else { "" }.to_string(),
            prompt_preview,
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Create a new personality, optionally with conversation memory.
pub async fn create_personality(
    state: &mut AppState,
    name: &str,
    prompt: &str,
    memory: bool,
) -> anyhow::Result<()> {
    let id = state.controller.create_personality(name, prompt).await?;
    if memory {
        state
            .controller
            .update_personality(id, PersonalityUpdate {
                has_memory: Some(true),
                ..Default::default()
            })
            .await?;
    }
    println!(
        "  {} Created '{name}'. Activate it with: {}",
        style("*").cyan().bold(),
        style(format!("murmur activate \"{name}\"")).cyan()
    );
    Ok(())
}

/// Edit an existing personality.
pub async fn edit_personality(
    state: &mut AppState,
    name: &str,
    rename: Option<&str>,
    prompt: Option<&str>,
    memory: Option<bool>,
) -> anyhow::Result<()> {
    let id = find_by_name(state, name)?;
    let update = PersonalityUpdate {
        name: rename.map(str::to_string),
        prompt: prompt.map(str::to_string),
        has_memory: memory,
    };
    state.controller.update_personality(id, update).await?;
    println!("  {} Updated '{name}'.", style("*").cyan().bold());
    Ok(())
}

/// Activate a personality by name, deactivating all others.
pub async fn activate_personality(state: &mut AppState, name: &str) -> anyhow::Result<()> {
    let id = find_by_name(state, name)?;
    state.controller.activate_personality(id).await?;
    println!("  {} '{name}' is now active.", style("*").cyan().bold());
    Ok(())
}

/// Delete a personality after confirmation.
pub async fn delete_personality(
    state: &mut AppState,
    name: &str,
    force: bool,
) -> anyhow::Result<()> {
    let id = find_by_name(state, name)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete personality '{name}'?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  {}", style("Cancelled.").dim());
            return Ok(());
        }
    }

    state.controller.delete_personality(id).await?;
    println!("  {} Deleted '{name}'.", style("*").cyan().bold());
    Ok(())
}
