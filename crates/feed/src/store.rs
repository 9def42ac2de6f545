//! Client-side cache of the notification feed.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use outreach_core::{Notification, NotificationFeed};

/// Immutable view of the cached feed.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub notifications: Vec<Notification>,
    pub total_unread: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Shared cache of the most recent notification list plus unread count.
///
/// Two writers exist: the fixed-interval refresher and the reconciliation
/// path after a confirmed job completion. Both replace the full list — there
/// is no field-level merge, so the last fetch to resolve wins. Consumers must
/// tolerate a snapshot that is already stale by the time they read it; no
/// version check is attempted (accepted design simplification, carried over
/// as-is).
#[derive(Debug)]
pub struct FeedStore {
    state: RwLock<FeedSnapshot>,
    changed: watch::Sender<u64>,
}

impl FeedStore {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            state: RwLock::new(FeedSnapshot::default()),
            changed,
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Replace the cached feed wholesale.
    pub fn apply(&self, feed: NotificationFeed) {
        {
            let mut state = self.state.write().unwrap();
            state.notifications = feed.notifications;
            state.total_unread = feed.total_unread;
            state.refreshed_at = Some(Utc::now());
        }
        self.changed.send_modify(|v| *v += 1);
    }

    /// Current view of the cache.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.read().unwrap().clone()
    }

    /// Flip the local copy of a notification to read and drop the unread
    /// count. Idempotent; unknown ids are ignored.
    pub fn mark_read(&self, id: &str) {
        let mut updated = false;
        {
            let mut state = self.state.write().unwrap();
            if let Some(n) = state
                .notifications
                .iter_mut()
                .find(|n| n.id == id && !n.is_read)
            {
                n.is_read = true;
                updated = true;
            }
            if updated {
                state.total_unread = state.total_unread.saturating_sub(1);
            }
        }
        if updated {
            self.changed.send_modify(|v| *v += 1);
        }
    }

    /// Receiver that observes a version bump on every store update.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::NotificationMetadata;

    fn notification(id: &str, is_read: bool) -> Notification {
        Notification {
            id: id.into(),
            title: "t".into(),
            message: "m".into(),
            notification_type: "campaign_created".into(),
            metadata: NotificationMetadata::default(),
            is_read,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn apply_replaces_the_full_list() {
        let store = FeedStore::new();
        store.apply(NotificationFeed {
            notifications: vec![notification("a", false), notification("b", false)],
            total_unread: 2,
        });
        store.apply(NotificationFeed {
            notifications: vec![notification("c", false)],
            total_unread: 1,
        });

        let snap = store.snapshot();
        assert_eq!(snap.notifications.len(), 1);
        assert_eq!(snap.notifications[0].id, "c");
        assert_eq!(snap.total_unread, 1);
        assert!(snap.refreshed_at.is_some());
    }

    #[test]
    fn mark_read_is_idempotent() {
        let store = FeedStore::new();
        store.apply(NotificationFeed {
            notifications: vec![notification("a", false)],
            total_unread: 1,
        });

        store.mark_read("a");
        store.mark_read("a");
        store.mark_read("unknown");

        let snap = store.snapshot();
        assert!(snap.notifications[0].is_read);
        assert_eq!(snap.total_unread, 0);
    }

    #[test]
    fn subscribers_see_version_bumps() {
        let store = FeedStore::new();
        let rx = store.subscribe();
        let before = *rx.borrow();

        store.apply(NotificationFeed::default());
        assert_eq!(*rx.borrow(), before + 1);
    }
}
