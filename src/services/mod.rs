//! Business logic services.
//!
//! This module contains the inbox core: the notification store, the
//! read-state synchronizer, the view state machine, the popup notifier and
//! the engine that runs them on one task.
//!
//! Services are designed to be testable and independent of Tauri-specific code.

pub mod app_launcher;
pub mod inbox_engine;
pub mod inbox_events;
pub mod inbox_view;
pub mod notification_client;
pub mod notification_store;
pub mod popup;
pub mod read_sync;

pub use app_launcher::{AppLauncher, AppRegistry, InstalledApp, NoLauncher};
pub use inbox_engine::{InboxAction, InboxEngine, InboxHandle, InboxState};
pub use inbox_events::InboxEvent;
pub use inbox_view::{InboxView, ViewEffect, ViewEvent};
pub use notification_client::{Ack, NotificationApi, NotificationClient};
pub use notification_store::{NotificationStore, SnapshotApplied};
pub use popup::PopupNotifier;
pub use read_sync::ReadStateSynchronizer;
