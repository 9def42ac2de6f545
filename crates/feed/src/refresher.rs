//! Fixed-interval feed refresh task.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use outreach_client::{ApiError, ConsoleApi};

use crate::store::FeedStore;

/// How often the shared feed cache is refreshed.
pub const FEED_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Fetch the feed once and apply it to the store.
///
/// Shared by the refresher loop and the reconciliation path (a confirmed job
/// completion refreshes the cache immediately so the new notification is
/// visible without waiting for the next scheduled cycle).
pub async fn refresh_now(api: &dyn ConsoleApi, store: &FeedStore) -> Result<(), ApiError> {
    let feed = api.fetch_notification_feed().await?;
    store.apply(feed);
    Ok(())
}

/// Mark a notification read on the server and in the local cache, so the
/// read receipt is visible without waiting for the next refresh.
pub async fn mark_read(api: &dyn ConsoleApi, store: &FeedStore, id: &str) -> Result<(), ApiError> {
    api.mark_notification_read(id).await?;
    store.mark_read(id);
    Ok(())
}

/// Owned background task keeping a [`FeedStore`] fresh.
pub struct FeedRefresher {
    api: Arc<dyn ConsoleApi>,
    store: Arc<FeedStore>,
    interval: Duration,
}

/// Handle controlling a spawned refresher.
pub struct RefresherHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl RefresherHandle {
    /// Stop the refresher. No further fetch is issued after this returns.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

impl FeedRefresher {
    pub fn new(api: Arc<dyn ConsoleApi>, store: Arc<FeedStore>) -> Self {
        Self {
            api,
            store,
            interval: FEED_REFRESH_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the refresh loop. The first refresh runs immediately.
    pub fn spawn(self) -> RefresherHandle {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::debug!("feed refresher started");
            loop {
                if task_cancel.is_cancelled() {
                    break;
                }
                if let Err(err) = refresh_now(self.api.as_ref(), &self.store).await {
                    // Keep the previous snapshot; the next cycle retries.
                    tracing::warn!(error = %err, "feed refresh failed");
                }
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
            tracing::debug!("feed refresher stopped");
        });

        RefresherHandle { cancel, task }
    }
}
