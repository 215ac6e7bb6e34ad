//! Settings commands.

use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use console::style;
use dialoguer::Password;

use murmur_types::settings::{SettingsUpdate, Theme};

use crate::cli::SettingsAction;
use crate::state::AppState;

pub async fn run(state: &mut AppState, action: SettingsAction, json: bool) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show => show(state, json),
        SettingsAction::Set {
            api_key,
            model,
            temperature,
            max_tokens,
            theme,
        } => set(state, api_key, model, temperature, max_tokens, theme).await,
        SettingsAction::Validate { key } => validate(state, key.as_deref()).await,
    }
}

/// Mask a key for display: first few characters plus length.
fn mask_key(key: &str) -> String {
    let head: String = key.chars().take(6).collect();
    format!("{head}... ({} chars)", key.chars().count())
}

fn show(state: &AppState, json: bool) -> anyhow::Result<()> {
    let Some(settings) = state.controller.state().settings() else {
        println!("  {}", style("No settings loaded.").dim());
        return Ok(());
    };

    if json {
        // Never emit the credential, even masked, in machine output.
        let mut value = serde_json::to_value(settings)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "api_key".to_string(),
                serde_json::Value::Bool(settings.has_api_key()),
            );
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec!["model".to_string(), settings.model.clone()]);
    table.add_row(vec![
        "temperature".to_string(),
        settings.temperature.to_string(),
    ]);
    table.add_row(vec![
        "max_tokens".to_string(),
        settings.max_tokens.to_string(),
    ]);
    table.add_row(vec!["theme".to_string(), settings.theme.to_string()]);
    table.add_row(vec![
        "api_key".to_string(),
        match settings.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => mask_key(key),
            _ => "(not set)".to_string(),
        },
    ]);
    println!("{table}");
    Ok(())
}

async fn set(
    state: &mut AppState,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    theme: Option<String>,
) -> anyhow::Result<()> {
    let theme = theme
        .map(|t| t.parse::<Theme>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()?;

    // `--api-key` without a value prompts instead of leaking the key into
    // shell history.
    let api_key = match api_key {
        Some(value) if value.is_empty() => Some(
            Password::new()
                .with_prompt("API key (leave empty to clear)")
                .allow_empty_password(true)
                .interact()?,
        ),
        other => other,
    };

    // An explicitly failed credential check blocks saving the key; an
    // unvalidated key (cleared, blank) passes through.
    if let Some(key) = api_key.as_deref() {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            let spinner = indicatif::ProgressBar::new_spinner();
            spinner.set_message("checking key...");
            spinner.enable_steady_tick(std::time::Duration::from_millis(80));
            let valid = state.controller.validate_api_key(trimmed).await;
            spinner.finish_and_clear();
            if !valid {
                anyhow::bail!("the provider rejected this API key; settings were not changed");
            }
        }
    }

    let update = SettingsUpdate {
        api_key,
        model,
        temperature,
        max_tokens,
        theme,
    };
    state.controller.update_settings(update).await?;
    println!("  {} Settings saved.", style("*").cyan().bold());
    Ok(())
}

async fn validate(state: &AppState, key: Option<&str>) -> anyhow::Result<()> {
    let stored;
    let key = match key {
        Some(key) => key,
        None => {
            stored = state
                .controller
                .state()
                .settings()
                .and_then(|s| s.api_key.clone())
                .unwrap_or_default();
            stored.as_str()
        }
    };

    if key.trim().is_empty() {
        println!("  {} No API key to check.", style("!").yellow().bold());
        return Ok(());
    }

    if state.controller.validate_api_key(key).await {
        println!("  {} Key is valid.", style("✓").green().bold());
    } else {
        println!("  {} Key was rejected by the provider.", style("✗").red().bold());
    }
    Ok(())
}
