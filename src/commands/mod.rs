//! Tauri IPC command handlers.
//!
//! Commands exposed to the desktop frontend via Tauri's invoke system:
//! - `inbox`: inbox and popup actions, snapshot reads
//! - `notifications`: event forwarding and native notifications
//! - `settings`: inbox configuration

pub mod inbox;
pub mod notifications;
pub mod settings;

pub use inbox::*;
pub use notifications::{forward_events, send_native_notification};
pub use settings::{get_inbox_config, update_inbox_config};
