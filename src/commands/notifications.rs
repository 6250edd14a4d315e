//! Event forwarding and native notification commands.

use crate::error::AppError;
use crate::services::inbox_engine::InboxHandle;
use crate::services::inbox_events::InboxEvent;
use tauri::{AppHandle, Emitter};
use tauri_plugin_notification::NotificationExt;
use tokio::sync::broadcast::error::RecvError;

fn show_native(app: &AppHandle, title: &str, body: &str) -> Result<(), AppError> {
    app.notification()
        .builder()
        .title(title)
        .body(body)
        .sound("default")
        .show()
        .map_err(|e| AppError::internal(format!("Failed to send notification: {}", e)))
}

/// Send a native OS notification.
#[tauri::command]
pub async fn send_native_notification(
    app: AppHandle,
    title: String,
    body: String,
) -> Result<(), AppError> {
    show_native(&app, &title, &body)
}

/// Forward engine events to the webview.
///
/// New popups are also raised as native notifications.
pub fn forward_events(app: AppHandle, inbox: &InboxHandle) {
    let mut events = inbox.subscribe();

    tauri::async_runtime::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("[inbox] Event forwarder lagged, skipped {}", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if let InboxEvent::Popup(payload) = &event {
                if let Some(message) = &payload.message {
                    if let Err(e) = show_native(&app, &message.title, &message.body) {
                        log::warn!("[inbox] {}", e);
                    }
                }
            }

            if let Err(e) = app.emit(event.name(), &event) {
                log::warn!("[inbox] Failed to emit {}: {}", event.name(), e);
            }
        }
    });
}
