//! `outreach-feed`
//!
//! **Responsibility:** The shared notification feed and the generic polling
//! primitive built over it.
//!
//! This crate provides:
//! - [`FeedStore`]: process-wide cache of the most recent notification list
//!   plus unread count, refreshed wholesale (last write wins)
//! - [`FeedRefresher`]: owned background task refreshing the store on a
//!   fixed schedule
//! - [`NotificationCriteria`] + [`NotificationPoller`]: reusable
//!   poll-until-match primitive with one-shot and promise-style helpers
//! - [`ResearchToastListener`]: standalone feed consumer surfacing ad-hoc
//!   toasts for research completion
//!
//! Every component takes its API and store handles as constructor parameters;
//! nothing here reaches for a global.

pub mod criteria;
pub mod listener;
pub mod poller;
pub mod refresher;
pub mod store;

pub use criteria::NotificationCriteria;
pub use listener::{ListenerHandle, ResearchToastListener};
pub use poller::{
    NotificationPoller, PollerBuilder, PollerOptions, StopReason, WaitError, find_notification,
    wait_for_notification,
};
pub use refresher::{FEED_REFRESH_INTERVAL, FeedRefresher, RefresherHandle, mark_read, refresh_now};
pub use store::{FeedSnapshot, FeedStore};
