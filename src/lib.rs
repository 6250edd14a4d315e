//! Desktop Inbox - notification inbox engine for the cloud desktop shell.
//!
//! The core (store, read-state synchronizer, view state machine, popup
//! notifier and the engine running them) is plain async Rust. With the
//! `desktop` feature the engine is exposed to the webview as Tauri IPC
//! commands and events.

#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::InboxConfig;
pub use error::AppError;
pub use services::{InboxEngine, InboxHandle};

#[cfg(feature = "desktop")]
use services::{AppRegistry, InstalledApp, NotificationClient};
#[cfg(feature = "desktop")]
use std::sync::Arc;
#[cfg(feature = "desktop")]
use tauri::Manager;
#[cfg(feature = "desktop")]
use tauri_plugin_opener::OpenerExt;

/// Register the inbox plugins, engine and commands on a Tauri builder.
///
/// `defaults` is used when no config has been persisted yet; `apps` are the
/// installed desktop apps the billing action may open.
#[cfg(feature = "desktop")]
pub fn setup(
    builder: tauri::Builder<tauri::Wry>,
    defaults: InboxConfig,
    apps: Vec<InstalledApp>,
) -> tauri::Builder<tauri::Wry> {
    builder
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_store::Builder::new().build())
        .plugin(tauri_plugin_notification::init())
        .setup(move |app| {
            let config = commands::settings::load_config(app.handle(), defaults)?;
            let client = NotificationClient::new(&config)?;

            let opener = app.handle().clone();
            let launcher = AppRegistry::new(apps, move |url: &str| {
                opener
                    .opener()
                    .open_url(url, None::<&str>)
                    .map_err(|e| AppError::internal(format!("Failed to open {}: {}", url, e)))
            });

            let handle = tauri::async_runtime::block_on(async {
                InboxEngine::start_background(Arc::new(client), Arc::new(launcher), config)
            });

            commands::forward_events(app.handle().clone(), &handle);
            app.manage(handle);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::inbox::get_inbox_state,
            commands::inbox::get_inbox_messages,
            commands::inbox::open_inbox,
            commands::inbox::close_inbox,
            commands::inbox::switch_inbox_tab,
            commands::inbox::select_notification,
            commands::inbox::inbox_back,
            commands::inbox::inbox_charge,
            commands::inbox::mark_notifications_read,
            commands::inbox::mark_all_notifications_read,
            commands::inbox::refresh_notifications,
            commands::inbox::set_inbox_locale,
            commands::inbox::popup_view_detail,
            commands::inbox::popup_dismiss,
            commands::inbox::popup_charge,
            commands::notifications::send_native_notification,
            commands::settings::get_inbox_config,
            commands::settings::update_inbox_config,
        ])
}
