//! `outreach-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the correlation token, the domain error model, and the
//! notification data model shared by the feed cache and the job trackers.

pub mod error;
pub mod id;
pub mod notification;

pub use error::{DomainError, DomainResult};
pub use id::{CampaignId, ContactId, CorrelationToken, DispatchId, ResearchId};
pub use notification::{
    Notification, NotificationFeed, NotificationMetadata, TerminalOutcome,
    find_campaign_candidate, find_dispatch_candidate, find_research_candidate, notification_types,
};
