//! Standalone research-completion listener.
//!
//! Watches the shared [`FeedStore`] and surfaces one toast per unseen,
//! unread research-completion notification. Runs independently of the job
//! trackers: a research finishing long after its tracking job was evicted
//! (timeout path) still reaches the user through this listener.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use outreach_client::{Notifier, Toast, ToastVariant};
use outreach_core::{Notification, TerminalOutcome};

use crate::store::FeedStore;

/// Owned task surfacing research-completion toasts from the feed.
pub struct ResearchToastListener {
    store: Arc<FeedStore>,
    notifier: Arc<dyn Notifier>,
}

/// Handle controlling a spawned listener.
pub struct ListenerHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl ListenerHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

impl ResearchToastListener {
    pub fn new(store: Arc<FeedStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn spawn(self) -> ListenerHandle {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let mut changes = self.store.subscribe();
            // Entries already in the cache at startup were seen in a previous
            // session's feed; don't re-toast them.
            let mut seen: HashSet<String> = self
                .store
                .snapshot()
                .notifications
                .iter()
                .map(|n| n.id.clone())
                .collect();

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }

                for n in self.store.snapshot().notifications {
                    if n.is_read || seen.contains(&n.id) {
                        continue;
                    }
                    seen.insert(n.id.clone());
                    if let Some(outcome) = n.research_outcome() {
                        self.notifier.notify(research_toast(&n, outcome));
                    }
                }
            }
        });

        ListenerHandle { cancel, task }
    }
}

fn research_toast(n: &Notification, outcome: TerminalOutcome) -> Toast {
    let who = n
        .metadata
        .contact_name
        .clone()
        .unwrap_or_else(|| "your contacts".to_string());

    match outcome {
        TerminalOutcome::Success => Toast::new(
            "Research complete",
            format!("Research for {who} has finished."),
            ToastVariant::Success,
        )
        .with_action("View", "/contacts"),
        TerminalOutcome::Failure => Toast::new(
            "Research failed",
            n.metadata
                .error
                .clone()
                .unwrap_or_else(|| format!("Research for {who} did not finish.")),
            ToastVariant::Destructive,
        ),
    }
}
