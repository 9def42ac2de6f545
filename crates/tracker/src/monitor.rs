//! Per-registry polling and reconciliation loop.
//!
//! One [`ProcessingMonitor`] per job kind. The poll task ticks every
//! [`MonitorConfig::poll_interval`] while its registry holds jobs and parks
//! on the registry's wake signal otherwise — an empty registry issues no
//! feed traffic at all. A sibling task refreshes the cosmetic progress
//! estimate on a faster cadence.
//!
//! Correctness lives in the tick: a candidate notification is accepted as a
//! job's terminal event **only** when its embedded token equals the job's
//! correlation token. A domain-id match alone proves nothing — two
//! near-simultaneous jobs against the same domain id would otherwise
//! cross-attribute outcomes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use outreach_client::{ConsoleApi, Notifier};
use outreach_feed::{FeedStore, refresh_now};

use crate::job::JobStatus;
use crate::kinds::{JobKind, JobOutcome};
use crate::progress;
use crate::registry::JobRegistry;

/// Tick period of the reconciliation loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Per-job hard cap measured from insertion; a job still processing past it
/// is evicted with its outcome unresolved.
pub const MAX_POLL_DURATION: Duration = Duration::from_millis(180_000);

/// Timing knobs of a monitor. Defaults are the production constants; tests
/// shrink them.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub max_poll_duration: Duration,
    /// Grace period before evicting a completed job.
    pub success_evict_delay: Duration,
    /// Grace period before evicting a failed job.
    pub failure_evict_delay: Duration,
    /// Cadence of the cosmetic progress estimate.
    pub progress_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            max_poll_duration: MAX_POLL_DURATION,
            success_evict_delay: Duration::from_secs(3),
            failure_evict_delay: Duration::from_secs(5),
            progress_interval: Duration::from_millis(500),
        }
    }
}

/// Handle controlling a spawned monitor.
pub struct MonitorHandle {
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl MonitorHandle {
    /// Cancel the poll task, the progress task, and every pending eviction
    /// timer, then wait for a clean exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }
    }
}

/// Polling + reconciliation loop for one registry.
pub struct ProcessingMonitor<K: JobKind> {
    registry: Arc<JobRegistry<K::Details>>,
    api: Arc<dyn ConsoleApi>,
    feed: Arc<FeedStore>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl<K: JobKind> ProcessingMonitor<K> {
    pub fn new(
        registry: Arc<JobRegistry<K::Details>>,
        api: Arc<dyn ConsoleApi>,
        feed: Arc<FeedStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            api,
            feed,
            notifier,
            config: MonitorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the poll and progress tasks.
    pub fn spawn(self) -> MonitorHandle {
        let cancel = CancellationToken::new();

        let poll = tokio::spawn(run_poll_loop::<K>(
            Arc::clone(&self.registry),
            Arc::clone(&self.api),
            Arc::clone(&self.feed),
            Arc::clone(&self.notifier),
            self.config.clone(),
            cancel.clone(),
        ));
        let progress = tokio::spawn(run_progress_loop(
            self.registry,
            self.config,
            cancel.clone(),
        ));

        MonitorHandle {
            cancel,
            tasks: vec![poll, progress],
        }
    }
}

async fn run_poll_loop<K: JobKind>(
    registry: Arc<JobRegistry<K::Details>>,
    api: Arc<dyn ConsoleApi>,
    feed: Arc<FeedStore>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    tracing::info!(kind = K::name(), "processing monitor started");
    let mut active = registry.watch_active();
    loop {
        if cancel.is_cancelled() {
            break;
        }
        if !registry.is_polling() {
            // Nothing tracked: no timer, no feed traffic. An insert re-arms.
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = active.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        tick::<K>(&registry, &api, &feed, &notifier, &config, &cancel).await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
    tracing::info!(kind = K::name(), "processing monitor stopped");
}

/// One pass over the jobs that were processing at tick start. Per-job
/// outcomes are independent: an error or transition on one job never blocks
/// the rest of the pass.
async fn tick<K: JobKind>(
    registry: &Arc<JobRegistry<K::Details>>,
    api: &Arc<dyn ConsoleApi>,
    feed: &Arc<FeedStore>,
    notifier: &Arc<dyn Notifier>,
    config: &MonitorConfig,
    cancel: &CancellationToken,
) {
    for job in registry.processing_snapshot() {
        if cancel.is_cancelled() {
            return;
        }
        // The snapshot may be stale: skip anything that already left
        // `Processing` (at most one terminal transition per job).
        match registry.get(job.id) {
            Some(current) if current.status.is_processing() => {}
            _ => continue,
        }

        let elapsed = tokio::time::Instant::now().saturating_duration_since(job.started);
        if elapsed > config.max_poll_duration {
            // True outcome unknown; don't mark failed. The async notification
            // feed will carry the verdict eventually.
            tracing::info!(
                kind = K::name(),
                job_id = job.id,
                elapsed_secs = elapsed.as_secs(),
                "job exceeded poll window, evicting"
            );
            notifier.notify(K::timeout_toast(&job));
            registry.remove(job.id);
            continue;
        }

        registry.update_status(job.id, JobStatus::Processing, Some(Utc::now()));

        let candidate = match K::check(api.as_ref(), job.id).await {
            Ok(candidate) => candidate,
            Err(err) => {
                tracing::debug!(
                    kind = K::name(),
                    job_id = job.id,
                    error = %err,
                    "notification check failed"
                );
                registry.increment_retry(job.id);
                continue;
            }
        };
        if cancel.is_cancelled() {
            return;
        }

        let Some(notification) = candidate else {
            continue;
        };

        // Token reconciliation: the definitive check. A candidate without
        // this job's token belongs to another run of the same domain id.
        if notification.metadata.token.as_deref() != Some(job.token.as_str()) {
            tracing::debug!(
                kind = K::name(),
                job_id = job.id,
                "candidate token mismatch, ignoring"
            );
            continue;
        }

        match K::outcome(&notification) {
            Some(JobOutcome::Success) => {
                tracing::info!(kind = K::name(), job_id = job.id, "job completed");
                registry.update_status(job.id, JobStatus::Completed, Some(Utc::now()));
                registry.set_progress(job.id, 100);
                // Make the completion visible in the shared cache right away;
                // a failure here costs nothing, the scheduled refresh catches up.
                if let Err(err) = refresh_now(api.as_ref(), feed).await {
                    tracing::debug!(error = %err, "feed refresh after completion failed");
                }
                notifier.notify(K::success_toast(&job, &notification));
                schedule_eviction(
                    Arc::clone(registry),
                    job.id,
                    config.success_evict_delay,
                    cancel.child_token(),
                );
            }
            Some(JobOutcome::Failure) => {
                tracing::warn!(kind = K::name(), job_id = job.id, "job failed");
                registry.update_status(job.id, JobStatus::Failed, Some(Utc::now()));
                notifier.notify(K::failure_toast(&job, &notification));
                schedule_eviction(
                    Arc::clone(registry),
                    job.id,
                    config.failure_evict_delay,
                    cancel.child_token(),
                );
            }
            None => {
                // Tokened but not terminal for this kind; keep polling.
            }
        }
    }
}

/// Evict a job after its grace period unless the monitor shuts down first.
fn schedule_eviction<D: Clone + Send + Sync + 'static>(
    registry: Arc<JobRegistry<D>>,
    id: i64,
    delay: Duration,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                registry.remove(id);
            }
        }
    });
}

async fn run_progress_loop<D: Clone + Send + Sync + 'static>(
    registry: Arc<JobRegistry<D>>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    let mut active = registry.watch_active();
    loop {
        if cancel.is_cancelled() {
            break;
        }
        if !registry.is_polling() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = active.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        let now = tokio::time::Instant::now();
        for job in registry.processing_snapshot() {
            registry.set_progress(
                job.id,
                progress::estimate(job.started, now, config.max_poll_duration),
            );
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.progress_interval) => {}
        }
    }
}
