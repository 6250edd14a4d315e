//! Immutable inbox snapshot published by the notification store.

use crate::models::notification::{NotificationId, NotificationMessage};
use serde::{Deserialize, Serialize};

/// Inbox list tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxTab {
    #[default]
    Unread,
    Read,
}

/// One published view of the server's notifications.
///
/// Both partitions are sorted newest first. A snapshot is never mutated after
/// publication; the store replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxSnapshot {
    pub read: Vec<NotificationMessage>,
    pub unread: Vec<NotificationMessage>,

    /// Head of `unread` when it asks for a popup.
    pub popup_candidate: Option<NotificationMessage>,

    /// Locale the snapshot was built for.
    pub locale: String,

    /// When the snapshot was fetched (epoch seconds). `None` before the first fetch.
    pub fetched_at: Option<i64>,
}

/// Localized, display-ready fields of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMessage {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub sender: String,
    pub time: String,
    pub is_read: bool,
    pub billing: bool,
}

impl InboxSnapshot {
    /// Snapshot shown before the first successful fetch.
    pub fn empty(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Self::default()
        }
    }

    /// Messages listed under `tab`.
    pub fn tab(&self, tab: InboxTab) -> &[NotificationMessage] {
        match tab {
            InboxTab::Unread => &self.unread,
            InboxTab::Read => &self.read,
        }
    }

    /// Find a message in either partition.
    pub fn find(&self, id: &str) -> Option<&NotificationMessage> {
        self.unread
            .iter()
            .chain(self.read.iter())
            .find(|m| m.id == id)
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.unread.iter().any(|m| m.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.unread.len()
    }

    pub fn read_count(&self) -> usize {
        self.read.len()
    }

    /// Resolve a message's strings for this snapshot's locale.
    pub fn display(&self, message: &NotificationMessage) -> DisplayMessage {
        DisplayMessage {
            id: message.id.clone(),
            title: message.title.resolve(&self.locale).to_string(),
            body: message.body.resolve(&self.locale).to_string(),
            sender: message.sender.resolve(&self.locale).to_string(),
            time: message.display_time(),
            is_read: message.is_read,
            billing: message.is_billing(),
        }
    }

    /// Display rows for a tab.
    pub fn display_tab(&self, tab: InboxTab) -> Vec<DisplayMessage> {
        self.tab(tab).iter().map(|m| self.display(m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::LocalizedText;

    #[test]
    fn test_display_uses_snapshot_locale() {
        let mut msg = NotificationMessage::new("n1", 0);
        msg.title = LocalizedText::new("Hello").with_override("zh", "你好");
        msg.sender = LocalizedText::new("System");

        let snapshot = InboxSnapshot {
            unread: vec![msg.clone()],
            locale: "zh".to_string(),
            ..InboxSnapshot::default()
        };

        let display = snapshot.display(&msg);
        assert_eq!(display.title, "你好");
        assert_eq!(display.sender, "System");
        assert!(!display.billing);
    }

    #[test]
    fn test_find_searches_both_partitions() {
        let mut read = NotificationMessage::new("r", 1);
        read.is_read = true;
        let snapshot = InboxSnapshot {
            read: vec![read],
            unread: vec![NotificationMessage::new("u", 2)],
            ..InboxSnapshot::empty("en")
        };

        assert!(snapshot.find("r").is_some());
        assert!(snapshot.find("u").is_some());
        assert!(snapshot.find("x").is_none());
        assert!(snapshot.is_unread("u"));
        assert!(!snapshot.is_unread("r"));
        assert_eq!(snapshot.tab(InboxTab::Read).len(), 1);
    }
}
