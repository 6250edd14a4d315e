//! Notification store.
//!
//! Holds the latest immutable snapshot of the server's notifications and is
//! the only writer of it. A snapshot is built from a full fetch:
//! - duplicate ids are dropped (first occurrence wins)
//! - messages are partitioned by their read flag
//! - each partition is sorted newest first by `timestamp`
//! - the popup candidate is the unread head, only if it asks for a popup
//!
//! A failed fetch keeps the last good snapshot; the next tick retries.

use crate::error::AppError;
use crate::models::notification::{NotificationId, NotificationMessage};
use crate::models::snapshot::InboxSnapshot;
use crate::services::notification_client::NotificationApi;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Outcome of installing a new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotApplied {
    pub unread_count: usize,
    pub read_count: usize,

    /// Set when the popup candidate changed to a message not yet notified.
    pub new_popup: Option<NotificationMessage>,

    /// Entries dropped because their id was already present.
    pub dropped_duplicates: usize,
}

/// Build a snapshot from a full fetch.
///
/// Returns the snapshot and the number of duplicate entries dropped.
pub fn build_snapshot(
    messages: Vec<NotificationMessage>,
    locale: &str,
    fetched_at: i64,
) -> (InboxSnapshot, usize) {
    let mut seen: HashSet<NotificationId> = HashSet::with_capacity(messages.len());
    let mut dropped = 0;
    let mut read = Vec::new();
    let mut unread = Vec::new();

    for message in messages {
        if !seen.insert(message.id.clone()) {
            dropped += 1;
            continue;
        }
        if message.is_read {
            read.push(message);
        } else {
            unread.push(message);
        }
    }

    // Stable: equal timestamps keep server order.
    read.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    unread.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let popup_candidate = popup_candidate(&unread).cloned();

    let snapshot = InboxSnapshot {
        read,
        unread,
        popup_candidate,
        locale: locale.to_string(),
        fetched_at: Some(fetched_at),
    };
    (snapshot, dropped)
}

/// The unread head, if it asks for a popup. Later unread messages never qualify.
pub fn popup_candidate(unread: &[NotificationMessage]) -> Option<&NotificationMessage> {
    unread.first().filter(|m| m.triggers_popup)
}

/// Single owner of the published inbox snapshot.
pub struct NotificationStore {
    snapshot: Arc<InboxSnapshot>,
    locale: String,

    /// Id of the last candidate handed to the popup notifier.
    last_notified_popup: Option<NotificationId>,

    last_error: Option<String>,

    publisher: watch::Sender<Arc<InboxSnapshot>>,
}

impl NotificationStore {
    pub fn new(locale: impl Into<String>) -> Self {
        let locale = locale.into();
        let snapshot = Arc::new(InboxSnapshot::empty(locale.clone()));
        let (publisher, _) = watch::channel(snapshot.clone());
        Self {
            snapshot,
            locale,
            last_notified_popup: None,
            last_error: None,
            publisher,
        }
    }

    /// Latest published snapshot.
    pub fn current_snapshot(&self) -> Arc<InboxSnapshot> {
        self.snapshot.clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<InboxSnapshot>> {
        self.publisher.subscribe()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Change the locale for subsequent snapshots. Returns whether it changed.
    pub fn set_locale(&mut self, locale: impl Into<String>) -> bool {
        let locale = locale.into();
        if locale == self.locale {
            return false;
        }
        self.locale = locale;
        true
    }

    /// Message of the last failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetch from `api` and install the result.
    pub async fn refresh<A: NotificationApi>(
        &mut self,
        api: &A,
    ) -> Result<SnapshotApplied, AppError> {
        let result = api.list().await;
        self.apply_fetch(result)
    }

    /// Install the outcome of a fetch that ran elsewhere.
    ///
    /// On error the current snapshot stays untouched.
    pub fn apply_fetch(
        &mut self,
        result: Result<Vec<NotificationMessage>, AppError>,
    ) -> Result<SnapshotApplied, AppError> {
        match result {
            Ok(messages) => Ok(self.apply(messages)),
            Err(e) => {
                log::warn!("[store] Refresh failed, keeping last snapshot: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn apply(&mut self, messages: Vec<NotificationMessage>) -> SnapshotApplied {
        let (snapshot, dropped) = build_snapshot(messages, &self.locale, now());
        if dropped > 0 {
            log::warn!("[store] Dropped {} duplicate notification(s)", dropped);
        }

        let new_popup = match &snapshot.popup_candidate {
            Some(candidate) if self.last_notified_popup.as_ref() != Some(&candidate.id) => {
                self.last_notified_popup = Some(candidate.id.clone());
                Some(candidate.clone())
            }
            Some(_) => None,
            None => {
                self.last_notified_popup = None;
                None
            }
        };

        let applied = SnapshotApplied {
            unread_count: snapshot.unread_count(),
            read_count: snapshot.read_count(),
            new_popup,
            dropped_duplicates: dropped,
        };

        log::debug!(
            "[store] Snapshot applied: {} unread, {} read",
            applied.unread_count,
            applied.read_count
        );

        self.snapshot = Arc::new(snapshot);
        self.last_error = None;
        self.publisher.send_replace(self.snapshot.clone());
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notification_client::Ack;
    use std::sync::Mutex;

    fn msg(id: &str, ts: i64, is_read: bool, popup: bool) -> NotificationMessage {
        let mut m = NotificationMessage::new(id, ts);
        m.is_read = is_read;
        m.triggers_popup = popup;
        m
    }

    fn ids(list: &[NotificationMessage]) -> Vec<&str> {
        list.iter().map(|m| m.id.as_str()).collect()
    }

    struct ScriptedApi {
        responses: Mutex<Vec<Result<Vec<NotificationMessage>, AppError>>>,
    }

    impl NotificationApi for ScriptedApi {
        async fn list(&self) -> Result<Vec<NotificationMessage>, AppError> {
            self.responses.lock().unwrap().remove(0)
        }

        async fn mark_read(&self, ids: Vec<NotificationId>) -> Result<Ack, AppError> {
            Ok(Ack { ids })
        }
    }

    #[test]
    fn test_partition_is_total_and_exclusive() {
        let (snapshot, dropped) = build_snapshot(
            vec![
                msg("a", 1, true, false),
                msg("b", 2, false, false),
                msg("c", 3, true, false),
                msg("d", 4, false, false),
            ],
            "en",
            0,
        );

        assert_eq!(dropped, 0);
        assert_eq!(snapshot.read.len() + snapshot.unread.len(), 4);
        assert!(snapshot.read.iter().all(|m| m.is_read));
        assert!(snapshot.unread.iter().all(|m| !m.is_read));
        for m in &snapshot.read {
            assert!(!snapshot.is_unread(&m.id));
        }
    }

    #[test]
    fn test_partitions_sorted_newest_first() {
        let (snapshot, _) = build_snapshot(
            vec![
                msg("old", 10, false, false),
                msg("new", 30, false, false),
                msg("mid", 20, false, false),
                msg("r1", 5, true, false),
                msg("r2", 50, true, false),
            ],
            "en",
            0,
        );

        assert_eq!(ids(&snapshot.unread), vec!["new", "mid", "old"]);
        assert_eq!(ids(&snapshot.read), vec!["r2", "r1"]);
        assert!(snapshot
            .unread
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let (snapshot, dropped) = build_snapshot(
            vec![msg("a", 1, false, false), msg("a", 2, true, false)],
            "en",
            0,
        );
        assert_eq!(dropped, 1);
        assert_eq!(ids(&snapshot.unread), vec!["a"]);
        assert!(snapshot.read.is_empty());
    }

    #[test]
    fn test_popup_only_from_unread_head() {
        // id 2 is newer but does not ask for a popup; id 1 must not pop.
        let (snapshot, _) = build_snapshot(
            vec![msg("1", 100, false, true), msg("2", 200, false, false)],
            "en",
            0,
        );
        assert_eq!(ids(&snapshot.unread), vec!["2", "1"]);
        assert!(snapshot.popup_candidate.is_none());

        let (snapshot, _) = build_snapshot(vec![msg("1", 100, false, true)], "en", 0);
        assert_eq!(snapshot.popup_candidate.map(|m| m.id), Some("1".to_string()));
    }

    #[test]
    fn test_read_messages_never_pop() {
        let (snapshot, _) = build_snapshot(vec![msg("1", 100, true, true)], "en", 0);
        assert!(snapshot.popup_candidate.is_none());
    }

    #[tokio::test]
    async fn test_popup_dedup_across_refreshes() {
        let first = vec![msg("p", 100, false, true)];
        let api = ScriptedApi {
            responses: Mutex::new(vec![
                Ok(first.clone()),
                Ok(first.clone()),
                Ok(vec![msg("p", 100, true, true)]),
                Ok(first),
            ]),
        };
        let mut store = NotificationStore::new("en");

        let applied = store.refresh(&api).await.unwrap();
        assert_eq!(applied.new_popup.map(|m| m.id), Some("p".to_string()));

        // Identical data: no second notification.
        let applied = store.refresh(&api).await.unwrap();
        assert!(applied.new_popup.is_none());

        // Candidate disappears, then comes back: notified again.
        let applied = store.refresh(&api).await.unwrap();
        assert!(applied.new_popup.is_none());
        let applied = store.refresh(&api).await.unwrap();
        assert_eq!(applied.new_popup.map(|m| m.id), Some("p".to_string()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let api = ScriptedApi {
            responses: Mutex::new(vec![
                Ok(vec![msg("a", 1, false, false)]),
                Err(AppError::fetch("connection reset")),
            ]),
        };
        let mut store = NotificationStore::new("en");
        let mut rx = store.subscribe();

        store.refresh(&api).await.unwrap();
        let before = store.current_snapshot();
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        let err = store.refresh(&api).await.unwrap_err();
        assert!(err.is_fetch());
        assert_eq!(store.current_snapshot(), before);
        assert_eq!(store.last_error(), Some("Fetch error: connection reset"));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_carries_locale() {
        let api = ScriptedApi {
            responses: Mutex::new(vec![Ok(vec![]), Ok(vec![])]),
        };
        let mut store = NotificationStore::new("en");
        store.refresh(&api).await.unwrap();
        assert_eq!(store.current_snapshot().locale, "en");

        assert!(store.set_locale("zh"));
        assert!(!store.set_locale("zh"));
        store.refresh(&api).await.unwrap();
        assert_eq!(store.current_snapshot().locale, "zh");
    }
}
