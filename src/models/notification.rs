//! Notification message model.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque notification identifier (the server-side object name).
pub type NotificationId = String;

/// A display string with optional per-language overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    /// Text shown when no override exists for the active locale.
    pub default: String,

    /// Overrides keyed by language code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, String>,
}

impl LocalizedText {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            overrides: BTreeMap::new(),
        }
    }

    /// Add an override for `lang`. Empty overrides are ignored.
    pub fn with_override(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.overrides.insert(lang.into(), text);
        }
        self
    }

    /// Resolve the text for `lang`, falling back to the default.
    pub fn resolve(&self, lang: &str) -> &str {
        self.overrides
            .get(lang)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default)
    }
}

/// Classification that unlocks contextual actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Sent by the billing system; offers a "recharge" action.
    Billing,
}

/// A notification as held by the inbox.
///
/// Messages are created server-side and only ever arrive through a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    /// Unique id within a snapshot; also the id sent to the read endpoint.
    pub id: NotificationId,

    /// Server UID, stable across renames.
    #[serde(default)]
    pub uid: String,

    #[serde(default)]
    pub namespace: String,

    /// Creation time of the server object.
    pub created_at: Option<DateTime<Utc>>,

    /// Server-side read flag, mirrored locally.
    pub is_read: bool,

    /// Epoch seconds used for ordering and display.
    pub timestamp: i64,

    pub title: LocalizedText,
    pub body: LocalizedText,
    pub sender: LocalizedText,

    /// Eligible for the transient popup when it heads the unread list.
    pub triggers_popup: bool,

    pub category: Option<NotificationCategory>,
}

impl NotificationMessage {
    /// Create a message with empty display strings.
    pub fn new(id: impl Into<NotificationId>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            uid: String::new(),
            namespace: String::new(),
            created_at: None,
            is_read: false,
            timestamp,
            title: LocalizedText::default(),
            body: LocalizedText::default(),
            sender: LocalizedText::default(),
            triggers_popup: false,
            category: None,
        }
    }

    pub fn is_billing(&self) -> bool {
        self.category == Some(NotificationCategory::Billing)
    }

    /// `timestamp` formatted as `YYYY-MM-DD HH:mm` (UTC).
    pub fn display_time(&self) -> String {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Classify a message by its default sender name.
pub fn categorize(sender: &str, billing_sender: &str) -> Option<NotificationCategory> {
    if !billing_sender.is_empty() && sender == billing_sender {
        Some(NotificationCategory::Billing)
    } else {
        None
    }
}
