//! Generic poll-until-match primitive over the notification feed.
//!
//! A [`NotificationPoller`] repeatedly fetches the feed through an injected
//! [`ConsoleApi`] and tests every notification against a
//! [`NotificationCriteria`]. Fetch errors are reported and polling continues
//! at the same fixed interval — liveness over backoff complexity. The
//! controller stops on the first match, on the optional attempt cap, on the
//! optional wall-clock timeout, or when told to.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use outreach_client::{ApiError, ConsoleApi};
use outreach_core::Notification;

use crate::criteria::NotificationCriteria;

/// Default delay between poll cycles.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Why a poller stopped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A notification matched the criteria.
    Found,
    /// The wall-clock timeout elapsed without a match.
    Timeout,
    /// The attempt cap was reached without a match.
    MaxAttempts,
    /// `stop()` was called.
    Manual,
}

/// Polling schedule limits.
#[derive(Debug, Clone)]
pub struct PollerOptions {
    /// Delay from the end of one cycle to the start of the next.
    pub interval: Duration,
    /// Hard cap on poll cycles; `None` = unbounded.
    pub max_attempts: Option<u32>,
    /// Wall-clock cap measured from `start()`; independent of `max_attempts`.
    pub timeout: Option<Duration>,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

type FoundFn = dyn Fn(&Notification) + Send + Sync;
type PollFn = dyn Fn(&[Notification]) + Send + Sync;
type ErrorFn = dyn Fn(&ApiError) + Send + Sync;
type StopFn = dyn Fn(StopReason) + Send + Sync;

#[derive(Default)]
struct Callbacks {
    on_found: Option<Box<FoundFn>>,
    on_poll: Option<Box<PollFn>>,
    on_error: Option<Box<ErrorFn>>,
    on_stop: Option<Box<StopFn>>,
}

struct Shared {
    api: Arc<dyn ConsoleApi>,
    criteria: NotificationCriteria,
    options: PollerOptions,
    callbacks: Callbacks,
    running: AtomicBool,
    attempts: AtomicU32,
}

impl Shared {
    /// Flip to stopped and fire `on_stop` exactly once per run.
    fn finish(&self, reason: StopReason) {
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some(cb) = &self.callbacks.on_stop {
                cb(reason);
            }
        }
    }
}

/// Builder for a [`NotificationPoller`].
pub struct PollerBuilder {
    api: Arc<dyn ConsoleApi>,
    criteria: NotificationCriteria,
    options: PollerOptions,
    callbacks: Callbacks,
}

impl PollerBuilder {
    pub fn options(mut self, options: PollerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    pub fn max_attempts(mut self, max: u32) -> Self {
        self.options.max_attempts = Some(max);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Called with the matching notification, before `on_stop(Found)`.
    pub fn on_found(mut self, f: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.callbacks.on_found = Some(Box::new(f));
        self
    }

    /// Called with the full list on every successful fetch.
    pub fn on_poll(mut self, f: impl Fn(&[Notification]) + Send + Sync + 'static) -> Self {
        self.callbacks.on_poll = Some(Box::new(f));
        self
    }

    /// Called on fetch failure; polling continues.
    pub fn on_error(mut self, f: impl Fn(&ApiError) + Send + Sync + 'static) -> Self {
        self.callbacks.on_error = Some(Box::new(f));
        self
    }

    /// Called exactly once per run when the poller stops, with the reason.
    pub fn on_stop(mut self, f: impl Fn(StopReason) + Send + Sync + 'static) -> Self {
        self.callbacks.on_stop = Some(Box::new(f));
        self
    }

    pub fn build(self) -> NotificationPoller {
        NotificationPoller {
            shared: Arc::new(Shared {
                api: self.api,
                criteria: self.criteria,
                options: self.options,
                callbacks: self.callbacks,
                running: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
            }),
            cancel: Mutex::new(None),
        }
    }
}

/// Controller for a polling loop.
pub struct NotificationPoller {
    shared: Arc<Shared>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl NotificationPoller {
    pub fn builder(api: Arc<dyn ConsoleApi>, criteria: NotificationCriteria) -> PollerBuilder {
        PollerBuilder {
            api,
            criteria,
            options: PollerOptions::default(),
            callbacks: Callbacks::default(),
        }
    }

    /// Begin polling. The first cycle runs immediately (no initial delay).
    ///
    /// Idempotent while running: a second `start()` warns and does nothing —
    /// it never creates a second timer.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("notification poller already running, ignoring start()");
            return;
        }
        self.shared.attempts.store(0, Ordering::SeqCst);

        let cancel = CancellationToken::new();
        *self.cancel.lock().unwrap() = Some(cancel.clone());

        let shared = Arc::clone(&self.shared);
        tokio::spawn(poll_loop(shared, cancel));
    }

    /// Stop polling. On a stopped controller this is a silent no-op; on a
    /// running one the pending timer is cancelled before any further cycle
    /// can observe the feed, and `on_stop(Manual)` fires.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(cancel) = self.cancel.lock().unwrap().take() {
            cancel.cancel();
        }
        if let Some(cb) = &self.shared.callbacks.on_stop {
            cb(StopReason::Manual);
        }
    }

    pub fn is_polling(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Poll cycles run since the last `start()`.
    pub fn attempt_count(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

async fn poll_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let deadline = shared
        .options
        .timeout
        .map(|t| tokio::time::Instant::now() + t);

    loop {
        if cancel.is_cancelled() {
            return;
        }
        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                shared.finish(StopReason::Timeout);
                return;
            }
        }
        if let Some(max) = shared.options.max_attempts {
            if shared.attempts.load(Ordering::SeqCst) >= max {
                shared.finish(StopReason::MaxAttempts);
                return;
            }
        }

        shared.attempts.fetch_add(1, Ordering::SeqCst);
        match shared.api.fetch_notification_feed().await {
            Err(err) => {
                if cancel.is_cancelled() {
                    return;
                }
                tracing::debug!(error = %err, "notification poll failed");
                if let Some(cb) = &shared.callbacks.on_error {
                    cb(&err);
                }
            }
            Ok(feed) => {
                if cancel.is_cancelled() {
                    return;
                }
                if let Some(cb) = &shared.callbacks.on_poll {
                    cb(&feed.notifications);
                }
                if let Some(found) = feed
                    .notifications
                    .iter()
                    .find(|n| shared.criteria.matches(n))
                {
                    if let Some(cb) = &shared.callbacks.on_found {
                        cb(found);
                    }
                    shared.finish(StopReason::Found);
                    return;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(shared.options.interval) => {}
        }
    }
}

/// One-shot lookup: a single fetch, first match wins, no polling.
pub async fn find_notification(
    api: &dyn ConsoleApi,
    criteria: &NotificationCriteria,
) -> Result<Option<Notification>, ApiError> {
    let feed = api.fetch_notification_feed().await?;
    Ok(feed.notifications.into_iter().find(|n| criteria.matches(n)))
}

/// Failure of [`wait_for_notification`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum WaitError {
    #[error("timed out waiting for notification")]
    Timeout,
    #[error("exceeded maximum poll attempts")]
    MaxAttempts,
    #[error("wait was cancelled")]
    Cancelled,
    #[error(transparent)]
    Api(ApiError),
}

/// Promise-style polling: resolves with the first matching notification,
/// fails on any non-`Found` stop reason or on the first fetch error.
pub async fn wait_for_notification(
    api: Arc<dyn ConsoleApi>,
    criteria: NotificationCriteria,
    options: PollerOptions,
) -> Result<Notification, WaitError> {
    let (tx, rx) = oneshot::channel::<Result<Notification, WaitError>>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    fn resolve(
        tx: &Arc<Mutex<Option<oneshot::Sender<Result<Notification, WaitError>>>>>,
        result: Result<Notification, WaitError>,
    ) {
        if let Some(tx) = tx.lock().unwrap().take() {
            let _ = tx.send(result);
        }
    }

    let poller = NotificationPoller::builder(api, criteria)
        .options(options)
        .on_found({
            let tx = Arc::clone(&tx);
            move |n| resolve(&tx, Ok(n.clone()))
        })
        .on_error({
            let tx = Arc::clone(&tx);
            move |e| resolve(&tx, Err(WaitError::Api(e.clone())))
        })
        .on_stop({
            let tx = Arc::clone(&tx);
            move |reason| {
                let err = match reason {
                    StopReason::Found => return,
                    StopReason::Timeout => WaitError::Timeout,
                    StopReason::MaxAttempts => WaitError::MaxAttempts,
                    StopReason::Manual => WaitError::Cancelled,
                };
                resolve(&tx, Err(err));
            }
        })
        .build();

    poller.start();
    let result = rx.await.unwrap_or(Err(WaitError::Cancelled));
    // The error path resolves the wait while the loop keeps polling; reap it.
    poller.stop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use outreach_client::{
        CampaignSnapshot, ContactType, ResearchSnapshot, StartResearchResponse,
    };
    use outreach_core::{
        CampaignId, ContactId, NotificationFeed, NotificationMetadata, ResearchId,
    };

    /// Scripted feed: each fetch pops the next response; the last one
    /// repeats forever.
    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<NotificationFeed, ApiError>>>,
        fetches: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<NotificationFeed, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConsoleApi for ScriptedApi {
        async fn fetch_notification_feed(&self) -> Result<NotificationFeed, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap_or(Ok(NotificationFeed::default()))
            }
        }

        async fn mark_notification_read(&self, _id: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn start_bulk_research(
            &self,
            _contact_ids: &[ContactId],
            _contact_type: ContactType,
            _create_campaign: bool,
        ) -> Result<StartResearchResponse, ApiError> {
            unimplemented!("not used by poller tests")
        }

        async fn check_campaign_notifications(
            &self,
            _campaign_id: CampaignId,
        ) -> Result<Option<Notification>, ApiError> {
            unimplemented!("not used by poller tests")
        }

        async fn check_research_notifications(
            &self,
            _research_id: ResearchId,
        ) -> Result<Option<Notification>, ApiError> {
            unimplemented!("not used by poller tests")
        }

        async fn check_dispatch_notifications(
            &self,
            _campaign_id: CampaignId,
        ) -> Result<Option<Notification>, ApiError> {
            unimplemented!("not used by poller tests")
        }

        async fn poll_campaign_status(
            &self,
            _campaign_id: CampaignId,
        ) -> Result<CampaignSnapshot, ApiError> {
            unimplemented!("not used by poller tests")
        }

        async fn poll_research_status(
            &self,
            _research_id: ResearchId,
        ) -> Result<ResearchSnapshot, ApiError> {
            unimplemented!("not used by poller tests")
        }
    }

    fn welcome_notification() -> Notification {
        Notification {
            id: "n-1".into(),
            title: "Welcome".into(),
            message: "Welcome aboard".into(),
            notification_type: "system".into(),
            metadata: NotificationMetadata::default(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    fn feed_with(notifications: Vec<Notification>) -> NotificationFeed {
        NotificationFeed {
            total_unread: notifications.len() as u64,
            notifications,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn finds_match_on_immediate_first_poll() {
        let api = ScriptedApi::new(vec![Ok(feed_with(vec![welcome_notification()]))]);
        let found = Arc::new(AtomicUsize::new(0));

        let poller = NotificationPoller::builder(
            api.clone(),
            NotificationCriteria::new().search_term("welcome"),
        )
        .on_found({
            let found = Arc::clone(&found);
            move |_| {
                found.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

        poller.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(found.load(Ordering::SeqCst), 1);
        assert!(!poller.is_polling());
        assert_eq!(api.fetch_count(), 1);
        assert_eq!(poller.attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_do_not_stop_polling() {
        let api = ScriptedApi::new(vec![
            Err(ApiError::Network("connection reset".into())),
            Ok(feed_with(vec![welcome_notification()])),
        ]);
        let errors = Arc::new(AtomicUsize::new(0));
        let stop_reason = Arc::new(Mutex::new(None));

        let poller = NotificationPoller::builder(
            api.clone(),
            NotificationCriteria::new().search_term("welcome"),
        )
        .on_error({
            let errors = Arc::clone(&errors);
            move |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        })
        .on_stop({
            let stop_reason = Arc::clone(&stop_reason);
            move |r| {
                *stop_reason.lock().unwrap() = Some(r);
            }
        })
        .build();

        poller.start();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(*stop_reason.lock().unwrap(), Some(StopReason::Found));
    }

    #[tokio::test(start_paused = true)]
    async fn max_attempts_stops_without_matching() {
        let api = ScriptedApi::new(vec![Ok(NotificationFeed::default())]);
        let stop_reason = Arc::new(Mutex::new(None));

        let poller = NotificationPoller::builder(
            api.clone(),
            NotificationCriteria::new().search_term("welcome"),
        )
        .interval(Duration::from_millis(100))
        .max_attempts(3)
        .on_stop({
            let stop_reason = Arc::clone(&stop_reason);
            move |r| {
                *stop_reason.lock().unwrap() = Some(r);
            }
        })
        .build();

        poller.start();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(*stop_reason.lock().unwrap(), Some(StopReason::MaxAttempts));
        assert_eq!(api.fetch_count(), 3);
        assert!(!poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_is_a_no_op() {
        let api = ScriptedApi::new(vec![Ok(NotificationFeed::default())]);

        let poller = NotificationPoller::builder(
            api.clone(),
            NotificationCriteria::new().search_term("welcome"),
        )
        .interval(Duration::from_secs(5))
        .build();

        poller.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.start(); // second start must not spawn a second loop

        tokio::time::sleep(Duration::from_secs(11)).await;
        // One immediate cycle plus two interval cycles; a doubled timer
        // would have produced roughly twice as many.
        assert_eq!(api.fetch_count(), 3);

        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_not_running_fires_no_callback() {
        let api = ScriptedApi::new(vec![Ok(NotificationFeed::default())]);
        let stops = Arc::new(AtomicUsize::new(0));

        let poller = NotificationPoller::builder(
            api,
            NotificationCriteria::new().search_term("welcome"),
        )
        .on_stop({
            let stops = Arc::clone(&stops);
            move |_| {
                stops.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

        poller.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        poller.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        // Stopping again stays silent.
        poller.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_notification_times_out() {
        // Feed never contains the term: the wait must fail with Timeout
        // within one interval past the deadline.
        let api = ScriptedApi::new(vec![Ok(NotificationFeed::default())]);

        let started = tokio::time::Instant::now();
        let result = wait_for_notification(
            api,
            NotificationCriteria::new().search_term("Welcome"),
            PollerOptions {
                interval: Duration::from_millis(500),
                max_attempts: None,
                timeout: Some(Duration::from_millis(1000)),
            },
        )
        .await;

        assert!(matches!(result, Err(WaitError::Timeout)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed <= Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_notification_resolves_with_the_match() {
        let api = ScriptedApi::new(vec![
            Ok(NotificationFeed::default()),
            Ok(feed_with(vec![welcome_notification()])),
        ]);

        let result = wait_for_notification(
            api,
            NotificationCriteria::new().search_term("Welcome"),
            PollerOptions::default(),
        )
        .await;

        assert_eq!(result.unwrap().id, "n-1");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_notification_fails_on_first_fetch_error() {
        let api = ScriptedApi::new(vec![Err(ApiError::Network("boom".into()))]);

        let result = wait_for_notification(
            api,
            NotificationCriteria::new().search_term("Welcome"),
            PollerOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(WaitError::Api(_))));
    }
}
