//! Inbox commands.
//!
//! Thin wrappers forwarding frontend actions to the inbox engine. Every
//! action returns the resulting `InboxState` so the frontend can render
//! without a second round trip.

use crate::error::AppError;
use crate::models::notification::NotificationId;
use crate::models::snapshot::{DisplayMessage, InboxTab};
use crate::services::inbox_engine::{InboxHandle, InboxState};
use crate::services::notification_client::Ack;
use crate::services::notification_store::SnapshotApplied;
use serde::Serialize;
use tauri::State;

/// Response for get_inbox_messages command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessagesResponse {
    pub tab: InboxTab,
    pub messages: Vec<DisplayMessage>,
    /// Unread badge amount.
    pub unread_count: usize,
}

#[tauri::command]
pub async fn get_inbox_state(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.state().await
}

/// Localized rows of one tab from the latest snapshot.
#[tauri::command]
pub async fn get_inbox_messages(
    inbox: State<'_, InboxHandle>,
    tab: InboxTab,
) -> Result<InboxMessagesResponse, AppError> {
    let snapshot = inbox.snapshot();
    Ok(InboxMessagesResponse {
        tab,
        messages: snapshot.display_tab(tab),
        unread_count: snapshot.unread_count(),
    })
}

#[tauri::command]
pub async fn open_inbox(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.open().await
}

#[tauri::command]
pub async fn close_inbox(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.close().await
}

#[tauri::command]
pub async fn switch_inbox_tab(
    inbox: State<'_, InboxHandle>,
    tab: InboxTab,
) -> Result<InboxState, AppError> {
    inbox.switch_tab(tab).await
}

#[tauri::command]
pub async fn select_notification(
    inbox: State<'_, InboxHandle>,
    id: NotificationId,
) -> Result<InboxState, AppError> {
    if id.is_empty() {
        return Err(AppError::invalid_input_field("Notification id is empty", "id"));
    }
    inbox.select(id).await
}

#[tauri::command]
pub async fn inbox_back(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.back().await
}

/// Billing action from the detail screen.
#[tauri::command]
pub async fn inbox_charge(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.detail_charge().await
}

#[tauri::command]
pub async fn mark_notifications_read(
    inbox: State<'_, InboxHandle>,
    ids: Vec<NotificationId>,
) -> Result<Ack, AppError> {
    inbox.mark_read(ids).await
}

#[tauri::command]
pub async fn mark_all_notifications_read(
    inbox: State<'_, InboxHandle>,
) -> Result<Ack, AppError> {
    inbox.mark_all_read().await
}

#[tauri::command]
pub async fn refresh_notifications(
    inbox: State<'_, InboxHandle>,
) -> Result<SnapshotApplied, AppError> {
    inbox.refresh().await
}

#[tauri::command]
pub async fn set_inbox_locale(
    inbox: State<'_, InboxHandle>,
    locale: String,
) -> Result<(), AppError> {
    inbox.set_locale(locale).await
}

#[tauri::command]
pub async fn popup_view_detail(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.popup_view_detail().await
}

#[tauri::command]
pub async fn popup_dismiss(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.popup_dismiss().await
}

#[tauri::command]
pub async fn popup_charge(inbox: State<'_, InboxHandle>) -> Result<InboxState, AppError> {
    inbox.popup_charge().await
}
