//! In-memory registries of in-flight jobs.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::job::{JobStatus, TrackedJob};

/// Synchronous state container for one kind of tracked job.
///
/// All mutation entry points are plain synchronous reducers behind one lock;
/// the monitor and UI only ever observe cloned snapshots. The polling-active
/// flag is true iff the registry is non-empty — it gates whether the
/// monitor's tick loop runs at all, and a parked monitor re-arms by watching
/// it rather than running its own timer.
#[derive(Debug)]
pub struct JobRegistry<D> {
    jobs: RwLock<HashMap<i64, TrackedJob<D>>>,
    active: watch::Sender<bool>,
}

impl<D: Clone> JobRegistry<D> {
    pub fn new() -> Self {
        let (active, _) = watch::channel(false);
        Self {
            jobs: RwLock::new(HashMap::new()),
            active,
        }
    }

    pub fn arc() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new())
    }

    /// Insert a job unless one with the same domain id is already tracked.
    /// Returns whether the job was inserted.
    pub fn add(&self, job: TrackedJob<D>) -> bool {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            tracing::debug!(job_id = job.id, "job already tracked, ignoring insert");
            return false;
        }
        jobs.insert(job.id, job);
        drop(jobs);

        self.set_active(true);
        true
    }

    /// Update a job's status (and optionally `last_polled`). Absent ids are
    /// ignored. A job that already reached a terminal state keeps it — at
    /// most one terminal transition, ever.
    pub fn update_status(&self, id: i64, status: JobStatus, last_polled: Option<DateTime<Utc>>) {
        let mut jobs = self.jobs.write().unwrap();
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };
        if let Some(at) = last_polled {
            job.last_polled = Some(at);
        }
        if job.status.is_terminal() && status != job.status {
            tracing::debug!(job_id = id, from = ?job.status, to = ?status, "ignoring status change on terminal job");
            return;
        }
        job.status = status;
    }

    /// Bump a job's poll-error counter. Absent ids are ignored.
    pub fn increment_retry(&self, id: i64) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(&id) {
            job.retry_count += 1;
        }
    }

    /// Set the cosmetic progress estimate. Absent ids are ignored.
    pub fn set_progress(&self, id: i64, progress: u8) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(&id) {
            job.progress = progress.min(100);
        }
    }

    /// Evict a job. Returns whether it was present.
    pub fn remove(&self, id: i64) -> bool {
        let mut jobs = self.jobs.write().unwrap();
        let removed = jobs.remove(&id).is_some();
        let empty = jobs.is_empty();
        drop(jobs);
        if empty {
            self.set_active(false);
        }
        removed
    }

    /// Drop every job that reached a terminal state.
    pub fn clear_completed(&self) {
        let mut jobs = self.jobs.write().unwrap();
        jobs.retain(|_, job| !job.status.is_terminal());
        let empty = jobs.is_empty();
        drop(jobs);
        if empty {
            self.set_active(false);
        }
    }

    /// Drop everything.
    pub fn clear_all(&self) {
        self.jobs.write().unwrap().clear();
        self.set_active(false);
    }

    pub fn is_polling(&self) -> bool {
        *self.active.borrow()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().unwrap().is_empty()
    }

    pub fn get(&self, id: i64) -> Option<TrackedJob<D>> {
        self.jobs.read().unwrap().get(&id).cloned()
    }

    /// Every tracked job in stable insertion-time order (for display).
    pub fn jobs(&self) -> Vec<TrackedJob<D>> {
        let mut all: Vec<_> = self.jobs.read().unwrap().values().cloned().collect();
        all.sort_by_key(|j| (j.started_at, j.id));
        all
    }

    /// Jobs currently in `Processing`, in stable insertion-time order. The
    /// monitor snapshots this at tick start; jobs added mid-tick are picked
    /// up on the next tick.
    pub fn processing_snapshot(&self) -> Vec<TrackedJob<D>> {
        let mut processing: Vec<_> = self
            .jobs
            .read()
            .unwrap()
            .values()
            .filter(|j| j.status.is_processing())
            .cloned()
            .collect();
        processing.sort_by_key(|j| (j.started_at, j.id));
        processing
    }

    /// Receiver over the polling-active flag. A parked monitor awaits a
    /// change here instead of ticking an idle timer.
    pub(crate) fn watch_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    fn set_active(&self, value: bool) {
        self.active.send_if_modified(|current| {
            if *current != value {
                *current = value;
                true
            } else {
                false
            }
        });
    }
}

impl<D: Clone> Default for JobRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}
