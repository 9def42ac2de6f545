//! The three job kinds and their reconciliation hooks.
//!
//! The tracker state machine is kind-agnostic; everything that differs
//! between campaign creation, bulk research, and dispatch — which check API
//! to call, what counts as a terminal notification, and what the user sees —
//! lives behind [`JobKind`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use outreach_client::{ApiError, ConsoleApi, Toast, ToastVariant};
use outreach_core::{CampaignId, Notification, ResearchId, TerminalOutcome};

use crate::job::TrackedJob;

/// Terminal verdict a candidate notification carries for a job.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failure,
}

impl From<TerminalOutcome> for JobOutcome {
    fn from(value: TerminalOutcome) -> Self {
        match value {
            TerminalOutcome::Success => JobOutcome::Success,
            TerminalOutcome::Failure => JobOutcome::Failure,
        }
    }
}

/// Kind-specific hooks the generic monitor is instantiated with.
#[async_trait]
pub trait JobKind: Send + Sync + 'static {
    /// Presentational fields carried by this kind's job records.
    type Details: Clone + Send + Sync + 'static;

    /// Kind label used in logs.
    fn name() -> &'static str;

    /// Fetch the at-most-one candidate notification for this domain id.
    async fn check(api: &dyn ConsoleApi, id: i64) -> Result<Option<Notification>, ApiError>;

    /// Classify a (token-validated) candidate as success or failure.
    fn outcome(notification: &Notification) -> Option<JobOutcome>;

    fn success_toast(job: &TrackedJob<Self::Details>, notification: &Notification) -> Toast;

    fn failure_toast(job: &TrackedJob<Self::Details>, notification: &Notification) -> Toast;

    /// Toast shown when the job outlives the poll window and is evicted with
    /// its outcome unresolved.
    fn timeout_toast(job: &TrackedJob<Self::Details>) -> Toast;
}

fn failure_description(notification: &Notification, fallback: &str) -> String {
    notification
        .metadata
        .error
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

// ---- campaign creation ----

/// Presentational fields of a campaign-creation job.
#[derive(Debug, Clone)]
pub struct CampaignDetails {
    pub name: String,
    pub recipient_count: u32,
}

pub struct CampaignKind;

#[async_trait]
impl JobKind for CampaignKind {
    type Details = CampaignDetails;

    fn name() -> &'static str {
        "campaign"
    }

    async fn check(api: &dyn ConsoleApi, id: i64) -> Result<Option<Notification>, ApiError> {
        api.check_campaign_notifications(CampaignId::new(id)).await
    }

    fn outcome(notification: &Notification) -> Option<JobOutcome> {
        notification.campaign_creation_outcome().map(Into::into)
    }

    fn success_toast(job: &TrackedJob<Self::Details>, _notification: &Notification) -> Toast {
        Toast::new(
            "Campaign created",
            format!("\"{}\" is ready to review.", job.details.name),
            ToastVariant::Success,
        )
        .with_action("View", format!("/campaigns/{}", job.id))
    }

    fn failure_toast(job: &TrackedJob<Self::Details>, notification: &Notification) -> Toast {
        Toast::new(
            "Campaign creation failed",
            failure_description(
                notification,
                &format!("\"{}\" could not be created.", job.details.name),
            ),
            ToastVariant::Destructive,
        )
    }

    fn timeout_toast(job: &TrackedJob<Self::Details>) -> Toast {
        Toast::new(
            "Taking longer than expected",
            format!(
                "\"{}\" is still being created. You'll get a notification when it finishes.",
                job.details.name
            ),
            ToastVariant::Info,
        )
    }
}

// ---- bulk research ----

/// Presentational fields of a bulk-research job.
#[derive(Debug, Clone)]
pub struct ResearchDetails {
    pub contact_count: u32,
    pub create_campaign: bool,
}

pub struct ResearchKind;

#[async_trait]
impl JobKind for ResearchKind {
    type Details = ResearchDetails;

    fn name() -> &'static str {
        "research"
    }

    async fn check(api: &dyn ConsoleApi, id: i64) -> Result<Option<Notification>, ApiError> {
        api.check_research_notifications(ResearchId::new(id)).await
    }

    fn outcome(notification: &Notification) -> Option<JobOutcome> {
        notification.research_outcome().map(Into::into)
    }

    fn success_toast(job: &TrackedJob<Self::Details>, notification: &Notification) -> Toast {
        let who = notification
            .metadata
            .contact_name
            .clone()
            .unwrap_or_else(|| format!("{} contacts", job.details.contact_count));
        let path = notification
            .metadata
            .campaign_id
            .map(|id| format!("/campaigns/{id}"))
            .unwrap_or_else(|| "/contacts".to_string());

        Toast::new(
            "Research complete",
            format!("Research for {who} has finished."),
            ToastVariant::Success,
        )
        .with_action("View", path)
    }

    fn failure_toast(job: &TrackedJob<Self::Details>, notification: &Notification) -> Toast {
        Toast::new(
            "Research failed",
            failure_description(
                notification,
                &format!(
                    "Research for {} contacts did not finish.",
                    job.details.contact_count
                ),
            ),
            ToastVariant::Destructive,
        )
    }

    fn timeout_toast(job: &TrackedJob<Self::Details>) -> Toast {
        Toast::new(
            "Taking longer than expected",
            format!(
                "Research for {} contacts is still running. You'll get a notification when it finishes.",
                job.details.contact_count
            ),
            ToastVariant::Info,
        )
    }
}

// ---- dispatch (campaign sends) ----

/// Presentational fields of a dispatch job.
#[derive(Debug, Clone)]
pub struct DispatchDetails {
    pub campaign_name: String,
    pub recipient_count: u32,
    /// Set for sends queued into the future; such jobs stay `Scheduled` and
    /// are never polled until an external update flips them to `Processing`.
    pub scheduled_for: Option<DateTime<Utc>>,
}

pub struct DispatchKind;

#[async_trait]
impl JobKind for DispatchKind {
    type Details = DispatchDetails;

    fn name() -> &'static str {
        "dispatch"
    }

    async fn check(api: &dyn ConsoleApi, id: i64) -> Result<Option<Notification>, ApiError> {
        api.check_dispatch_notifications(CampaignId::new(id)).await
    }

    fn outcome(notification: &Notification) -> Option<JobOutcome> {
        notification.campaign_send_outcome().map(Into::into)
    }

    fn success_toast(job: &TrackedJob<Self::Details>, _notification: &Notification) -> Toast {
        Toast::new(
            "Campaign sent",
            format!(
                "\"{}\" was sent to {} recipients.",
                job.details.campaign_name, job.details.recipient_count
            ),
            ToastVariant::Success,
        )
        .with_action("View", format!("/campaigns/{}/report", job.id))
    }

    fn failure_toast(job: &TrackedJob<Self::Details>, notification: &Notification) -> Toast {
        Toast::new(
            "Campaign send failed",
            failure_description(
                notification,
                &format!("\"{}\" could not be sent.", job.details.campaign_name),
            ),
            ToastVariant::Destructive,
        )
    }

    fn timeout_toast(job: &TrackedJob<Self::Details>) -> Toast {
        Toast::new(
            "Taking longer than expected",
            format!(
                "\"{}\" is still sending. You'll get a notification when it finishes.",
                job.details.campaign_name
            ),
            ToastVariant::Info,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::{NotificationMetadata, notification_types};

    fn notification(ntype: &str) -> Notification {
        Notification {
            id: "n".into(),
            title: String::new(),
            message: String::new(),
            notification_type: ntype.into(),
            metadata: NotificationMetadata::default(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn outcomes_stay_within_their_family() {
        let created = notification(notification_types::CAMPAIGN_CREATED);
        assert_eq!(CampaignKind::outcome(&created), Some(JobOutcome::Success));
        assert_eq!(DispatchKind::outcome(&created), None);
        assert_eq!(ResearchKind::outcome(&created), None);

        let sent = notification(notification_types::CAMPAIGN_SENT);
        assert_eq!(DispatchKind::outcome(&sent), Some(JobOutcome::Success));
        assert_eq!(CampaignKind::outcome(&sent), None);
    }

    #[test]
    fn failure_toast_prefers_server_error_text() {
        let mut n = notification(notification_types::CAMPAIGN_CREATE_FAILED);
        n.metadata.error = Some("template missing".into());

        let job = TrackedJob::new(
            3,
            "t1",
            CampaignDetails {
                name: "Spring launch".into(),
                recipient_count: 120,
            },
        );
        let toast = CampaignKind::failure_toast(&job, &n);
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.description, "template missing");
    }

    #[test]
    fn research_success_toast_names_the_contact() {
        let mut n = notification(notification_types::RESEARCH_COMPLETE_SUCCESS);
        n.metadata.contact_name = Some("Jane".into());

        let job = TrackedJob::new(
            7,
            "abc",
            ResearchDetails {
                contact_count: 1,
                create_campaign: false,
            },
        );
        let toast = ResearchKind::success_toast(&job, &n);
        assert!(toast.description.contains("Jane"));
        assert_eq!(toast.action.unwrap().path, "/contacts");
    }
}
