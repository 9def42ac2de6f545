//! Remote console API abstraction.
//!
//! The polling subsystem never imports a concrete HTTP client: everything it
//! needs from the outside world is expressed on [`ConsoleApi`] and injected
//! (constructor parameter, `Arc<dyn ConsoleApi>`). This keeps the pollers and
//! trackers unit-testable without a server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use outreach_core::{
    CampaignId, ContactId, CorrelationToken, Notification, NotificationFeed, ResearchId,
};

/// Error returned by any remote operation.
///
/// `Clone` so poll loops can hand the same error to callbacks and telemetry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
}

/// Contact kind a bulk-research run targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Lead,
    Client,
}

/// Wire response of the bulk-research start call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResearchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<CorrelationToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Direct campaign status, used as a fallback path only — the
/// notification-driven reconciliation does not rely on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub id: CampaignId,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Direct research status (fallback path, see [`CampaignSnapshot`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSnapshot {
    pub id: ResearchId,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_contacts: Option<u32>,
}

/// Every remote operation the polling subsystem consumes.
///
/// The `check_*` operations return **at most one** candidate notification
/// scoped to a domain id. A candidate is not proof of correspondence: callers
/// must still compare `metadata.token` against the job's correlation token
/// before acting on it.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    /// Fetch the current notification feed. Idempotent; safe to call on a
    /// fixed interval indefinitely.
    async fn fetch_notification_feed(&self) -> Result<NotificationFeed, ApiError>;

    /// Mark a notification read. Idempotent (marking an already-read
    /// notification is a no-op success).
    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError>;

    /// Start a bulk-research run over the given contacts.
    async fn start_bulk_research(
        &self,
        contact_ids: &[ContactId],
        contact_type: ContactType,
        create_campaign: bool,
    ) -> Result<StartResearchResponse, ApiError>;

    /// Candidate terminal notification for a campaign-creation job.
    async fn check_campaign_notifications(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Notification>, ApiError>;

    /// Candidate terminal notification for a bulk-research job.
    async fn check_research_notifications(
        &self,
        research_id: ResearchId,
    ) -> Result<Option<Notification>, ApiError>;

    /// Candidate terminal notification for a dispatch (campaign send) job.
    async fn check_dispatch_notifications(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Notification>, ApiError>;

    /// Direct campaign status fetch (fallback path).
    async fn poll_campaign_status(
        &self,
        campaign_id: CampaignId,
    ) -> Result<CampaignSnapshot, ApiError>;

    /// Direct research status fetch (fallback path).
    async fn poll_research_status(
        &self,
        research_id: ResearchId,
    ) -> Result<ResearchSnapshot, ApiError>;
}
