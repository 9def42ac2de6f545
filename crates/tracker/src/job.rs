//! Tracked job records.

use chrono::{DateTime, Utc};

use outreach_core::CorrelationToken;

/// Lifecycle status of a tracked job.
///
/// `Completed` and `Failed` are terminal: once a job leaves `Processing` no
/// further status change is valid, only eviction. `Scheduled` is display-only
/// (dispatch jobs queued for a future send) and is never polled until an
/// external update moves it to `Processing`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Scheduled,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, JobStatus::Processing)
    }
}

/// An in-flight job awaiting its terminal notification.
///
/// `id` is the domain id the registry keys on; `token` is the only reliable
/// key for matching a terminal notification to this exact job (domain ids
/// may be shared by retried or duplicate jobs).
#[derive(Debug, Clone)]
pub struct TrackedJob<D> {
    pub id: i64,
    pub token: CorrelationToken,
    pub status: JobStatus,
    /// Wall-clock insertion time, for display and bookkeeping.
    pub started_at: DateTime<Utc>,
    /// Monotonic insertion instant, for timeout and progress math.
    pub started: tokio::time::Instant,
    /// Most recent poll cycle that examined this job. Observability only.
    pub last_polled: Option<DateTime<Utc>>,
    /// Poll-cycle errors seen for this job. Telemetry only; never triggers
    /// removal by itself.
    pub retry_count: u32,
    /// Cosmetic 0–100 progress estimate. Carries no correctness weight.
    pub progress: u8,
    pub details: D,
}

impl<D> TrackedJob<D> {
    /// A job that is processing from the moment it is tracked.
    pub fn new(id: i64, token: impl Into<CorrelationToken>, details: D) -> Self {
        Self {
            id,
            token: token.into(),
            status: JobStatus::Processing,
            started_at: Utc::now(),
            started: tokio::time::Instant::now(),
            last_polled: None,
            retry_count: 0,
            progress: 0,
            details,
        }
    }

    /// A job queued for later (dispatch scheduled sends).
    pub fn scheduled(id: i64, token: impl Into<CorrelationToken>, details: D) -> Self {
        Self {
            status: JobStatus::Scheduled,
            ..Self::new(id, token, details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Scheduled.is_terminal());
    }

    #[test]
    fn new_jobs_start_processing() {
        let job = TrackedJob::new(7, "abc", ());
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.progress, 0);
        assert!(job.last_polled.is_none());

        let job = TrackedJob::scheduled(8, "xyz", ());
        assert_eq!(job.status, JobStatus::Scheduled);
    }
}
