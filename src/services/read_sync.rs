//! Read-state synchronizer.
//!
//! Pushes mark-read requests to the server. It never edits the local
//! snapshot: once a request settles the engine refreshes the store, and the
//! server's answer becomes the new truth. That keeps the store the single
//! writer and makes retries safe, since marking an already-read id is a no-op.

use crate::error::AppError;
use crate::models::notification::NotificationId;
use crate::models::snapshot::InboxSnapshot;
use crate::services::notification_client::{Ack, NotificationApi};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Stateless mark-read client.
pub struct ReadStateSynchronizer<A> {
    api: Arc<A>,
}

impl<A> Clone for ReadStateSynchronizer<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
        }
    }
}

impl<A: NotificationApi> ReadStateSynchronizer<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Mark `ids` read on the server.
    ///
    /// An empty set succeeds without a request.
    pub async fn mark_read(&self, ids: BTreeSet<NotificationId>) -> Result<Ack, AppError> {
        if ids.is_empty() {
            return Ok(Ack::default());
        }

        let count = ids.len();
        log::debug!("[read-sync] Marking {} notification(s) read", count);

        match self.api.mark_read(ids.into_iter().collect()).await {
            Ok(ack) => Ok(ack),
            Err(e) => {
                let e = e.into_mutation(count);
                log::warn!("[read-sync] Mark read failed for {} id(s): {}", count, e);
                Err(e)
            }
        }
    }

    /// Mark every message that is unread in `snapshot` read.
    ///
    /// Messages arriving after `snapshot` was taken are not included.
    pub async fn mark_all_unread_as_read(
        &self,
        snapshot: &InboxSnapshot,
    ) -> Result<Ack, AppError> {
        self.mark_read(unread_ids(snapshot)).await
    }
}

/// Ids of the unread partition.
pub fn unread_ids(snapshot: &InboxSnapshot) -> BTreeSet<NotificationId> {
    snapshot.unread.iter().map(|m| m.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationMessage;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Server stand-in tracking read flags.
    #[derive(Default)]
    struct FakeServer {
        read: Mutex<BTreeMap<NotificationId, bool>>,
        calls: Mutex<Vec<Vec<NotificationId>>>,
        reject: bool,
    }

    impl NotificationApi for FakeServer {
        async fn list(&self) -> Result<Vec<NotificationMessage>, AppError> {
            Ok(Vec::new())
        }

        async fn mark_read(&self, ids: Vec<NotificationId>) -> Result<Ack, AppError> {
            self.calls.lock().unwrap().push(ids.clone());
            if self.reject {
                return Err(AppError::fetch_full("Access denied", 403, "/api/notification/read"));
            }
            let mut read = self.read.lock().unwrap();
            for id in &ids {
                read.insert(id.clone(), true);
            }
            Ok(Ack { ids })
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<NotificationId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let server = Arc::new(FakeServer::default());
        let sync = ReadStateSynchronizer::new(server.clone());

        sync.mark_read(set(&["a", "b"])).await.unwrap();
        let once = server.read.lock().unwrap().clone();

        sync.mark_read(set(&["a", "b"])).await.unwrap();
        let twice = server.read.lock().unwrap().clone();

        assert_eq!(once, twice);
        assert_eq!(server.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_set_skips_request() {
        let server = Arc::new(FakeServer::default());
        let sync = ReadStateSynchronizer::new(server.clone());

        let ack = sync.mark_read(BTreeSet::new()).await.unwrap();
        assert!(ack.ids.is_empty());
        assert!(server.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_mutation_error() {
        let server = Arc::new(FakeServer {
            reject: true,
            ..FakeServer::default()
        });
        let sync = ReadStateSynchronizer::new(server.clone());

        let err = sync.mark_read(set(&["a"])).await.unwrap_err();
        assert!(err.is_mutation());
        assert!(server.read.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_all_uses_unread_partition_only() {
        let server = Arc::new(FakeServer::default());
        let sync = ReadStateSynchronizer::new(server.clone());

        let mut read = NotificationMessage::new("old", 1);
        read.is_read = true;
        let snapshot = InboxSnapshot {
            read: vec![read],
            unread: vec![NotificationMessage::new("x", 3), NotificationMessage::new("y", 2)],
            ..InboxSnapshot::empty("en")
        };

        sync.mark_all_unread_as_read(&snapshot).await.unwrap();
        let calls = server.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[vec!["x".to_string(), "y".to_string()]]);
    }
}
