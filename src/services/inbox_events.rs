//! Inbox event types.
//!
//! The engine broadcasts these after each state change so a frontend can
//! update reactively. Event names double as desktop IPC event names.

use crate::models::snapshot::DisplayMessage;
use crate::services::inbox_view::InboxView;
use serde::Serialize;

/// Event: inbox-updated
/// Emitted when a new snapshot was installed.
pub const INBOX_UPDATED_EVENT: &str = "inbox-updated";

/// Event: inbox-popup
/// Emitted when the popup appears or is cleared.
pub const INBOX_POPUP_EVENT: &str = "inbox-popup";

/// Event: inbox-view-changed
/// Emitted after every accepted view transition.
pub const INBOX_VIEW_CHANGED_EVENT: &str = "inbox-view-changed";

/// Event: inbox-error
/// Emitted when a refresh, mark-read or app launch failed.
pub const INBOX_ERROR_EVENT: &str = "inbox-error";

/// Payload for inbox-updated events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxUpdatedPayload {
    /// Unread badge amount.
    pub unread_count: usize,
    pub read_count: usize,
    pub locale: String,
}

/// Payload for inbox-popup events. `message` is `None` when cleared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupPayload {
    pub message: Option<DisplayMessage>,
}

/// Source of an inbox-error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    Refresh,
    MarkRead,
    Launch,
}

/// Payload for inbox-error events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboxErrorPayload {
    pub source: ErrorSource,
    pub message: String,
}

/// Everything the engine broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum InboxEvent {
    Updated(InboxUpdatedPayload),
    Popup(PopupPayload),
    ViewChanged(InboxView),
    Error(InboxErrorPayload),
}

impl InboxEvent {
    /// IPC event name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Updated(_) => INBOX_UPDATED_EVENT,
            Self::Popup(_) => INBOX_POPUP_EVENT,
            Self::ViewChanged(_) => INBOX_VIEW_CHANGED_EVENT,
            Self::Error(_) => INBOX_ERROR_EVENT,
        }
    }
}
