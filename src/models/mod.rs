//! Data models for the inbox.
//!
//! These models are shared by the store, the view state machine and the IPC
//! layer. All of them derive Serialize so they can cross to the frontend.

pub mod notification;
pub mod snapshot;

// Re-exports for convenient access
pub use notification::{
    categorize, LocalizedText, NotificationCategory, NotificationId, NotificationMessage,
};
pub use snapshot::{DisplayMessage, InboxSnapshot, InboxTab};
