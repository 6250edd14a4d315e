//! Settings commands for the inbox configuration.
//!
//! The configuration is persisted using the tauri-plugin-store.

use crate::config::InboxConfig;
use crate::error::AppError;
use crate::services::inbox_engine::InboxHandle;
use tauri::{AppHandle, State};
use tauri_plugin_store::StoreExt;

/// Store filename for settings.
const SETTINGS_STORE: &str = "settings.json";

/// Key for the inbox config in the store.
const INBOX_CONFIG_KEY: &str = "inbox_config";

/// Load the inbox config from the store, using `fallback` if not found.
pub fn load_config(app: &AppHandle, fallback: InboxConfig) -> Result<InboxConfig, AppError> {
    let store = app
        .store(SETTINGS_STORE)
        .map_err(|e| AppError::internal(format!("Failed to open settings store: {}", e)))?;

    let config = match store.get(INBOX_CONFIG_KEY) {
        Some(value) => serde_json::from_value(value).unwrap_or(fallback),
        None => fallback,
    };
    config.validate()?;
    Ok(config)
}

/// Save the inbox config to the store.
fn save_config(app: &AppHandle, config: &InboxConfig) -> Result<(), AppError> {
    let store = app
        .store(SETTINGS_STORE)
        .map_err(|e| AppError::internal(format!("Failed to open settings store: {}", e)))?;

    store.set(INBOX_CONFIG_KEY, serde_json::to_value(config)?);

    store
        .save()
        .map_err(|e| AppError::internal(format!("Failed to save settings: {}", e)))?;

    Ok(())
}

/// Get the current inbox configuration.
#[tauri::command]
pub async fn get_inbox_config(inbox: State<'_, InboxHandle>) -> Result<InboxConfig, AppError> {
    Ok(inbox.get_config().await)
}

/// Update and persist the inbox configuration.
#[tauri::command]
pub async fn update_inbox_config(
    app: AppHandle,
    inbox: State<'_, InboxHandle>,
    config: InboxConfig,
) -> Result<(), AppError> {
    config.validate()?;
    save_config(&app, &config)?;
    inbox.update_config(config).await
}
