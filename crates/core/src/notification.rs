//! Notification data model and terminal-outcome vocabulary.
//!
//! Notifications are server-owned and append-only from the client's point of
//! view: the client only ever marks them read or lets them drop off the list.
//! The helpers at the bottom of this module classify a notification as a
//! terminal success/failure for one of the three job families and select the
//! at-most-one candidate a status check returns for a given domain id. The
//! candidate is *not* proof of correspondence — the tracker still validates
//! the correlation token before acting on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire values of `notification_type` the trackers understand.
pub mod notification_types {
    pub const CAMPAIGN_CREATED: &str = "campaign_created";
    pub const CAMPAIGN_CREATE_FAILED: &str = "campaign_create_failed";
    pub const CAMPAIGN_SENT: &str = "campaign_sent";
    pub const CAMPAIGN_SEND_FAILED: &str = "campaign_send_failed";
    pub const RESEARCH_COMPLETE_SUCCESS: &str = "research_complete_success";
    pub const RESEARCH_COMPLETE_FAILED: &str = "research_complete_failed";
}

/// A single entry of the server-maintained notification feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    #[serde(default)]
    pub metadata: NotificationMetadata,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Metadata embedded in a notification.
///
/// Typed fields cover the keys the trackers rely on; anything else the server
/// sends is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NotificationMetadata {
    /// Look up a metadata entry by key, typed fields first, as a display
    /// string. Returns `None` when the key is absent.
    pub fn value(&self, key: &str) -> Option<String> {
        match key {
            "token" => self.token.clone(),
            "campaign_id" => self.campaign_id.map(|v| v.to_string()),
            "research_id" => self.research_id.map(|v| v.to_string()),
            "contact_id" => self.contact_id.map(|v| v.to_string()),
            "contact_name" => self.contact_name.clone(),
            "campaign_name" => self.campaign_name.clone(),
            "error" => self.error.clone(),
            _ => self.extra.get(key).map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }
}

/// The notification feed as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationFeed {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub total_unread: u64,
}

/// Terminal outcome a notification reports for a job.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Success,
    Failure,
}

impl Notification {
    /// Terminal outcome for campaign *creation*, if this notification
    /// reports one.
    pub fn campaign_creation_outcome(&self) -> Option<TerminalOutcome> {
        use notification_types::*;
        match self.notification_type.as_str() {
            CAMPAIGN_CREATED => Some(TerminalOutcome::Success),
            CAMPAIGN_CREATE_FAILED => Some(TerminalOutcome::Failure),
            // Older servers send a bare family type and put the verdict in
            // the text.
            "campaign" => self.outcome_from_text(),
            _ => None,
        }
    }

    /// Terminal outcome for a campaign *send* (dispatch), if any.
    pub fn campaign_send_outcome(&self) -> Option<TerminalOutcome> {
        use notification_types::*;
        match self.notification_type.as_str() {
            CAMPAIGN_SENT => Some(TerminalOutcome::Success),
            CAMPAIGN_SEND_FAILED => Some(TerminalOutcome::Failure),
            "campaign_send" => self.outcome_from_text(),
            _ => None,
        }
    }

    /// Terminal outcome for a bulk-research run, if any.
    pub fn research_outcome(&self) -> Option<TerminalOutcome> {
        use notification_types::*;
        match self.notification_type.as_str() {
            RESEARCH_COMPLETE_SUCCESS => Some(TerminalOutcome::Success),
            RESEARCH_COMPLETE_FAILED => Some(TerminalOutcome::Failure),
            "research" => self.outcome_from_text(),
            _ => None,
        }
    }

    fn outcome_from_text(&self) -> Option<TerminalOutcome> {
        let text = format!("{} {}", self.title, self.message).to_lowercase();
        if text.contains("fail") {
            Some(TerminalOutcome::Failure)
        } else if text.contains("created") || text.contains("complete") || text.contains("sent") {
            Some(TerminalOutcome::Success)
        } else {
            None
        }
    }
}

/// Select the candidate notification a campaign-creation check returns: same
/// campaign id, terminal for campaign creation.
pub fn find_campaign_candidate(
    notifications: &[Notification],
    campaign_id: i64,
) -> Option<&Notification> {
    notifications.iter().find(|n| {
        n.metadata.campaign_id == Some(campaign_id) && n.campaign_creation_outcome().is_some()
    })
}

/// Select the candidate notification a dispatch check returns: same campaign
/// id, terminal for a campaign send.
pub fn find_dispatch_candidate(
    notifications: &[Notification],
    campaign_id: i64,
) -> Option<&Notification> {
    notifications.iter().find(|n| {
        n.metadata.campaign_id == Some(campaign_id) && n.campaign_send_outcome().is_some()
    })
}

/// Select the candidate notification a research check returns.
///
/// Research job ids are client-generated, so a notification's `research_id`
/// (the server's own id) usually cannot match. A notification that *does*
/// carry the requested id is preferred; otherwise the first research-terminal
/// entry is the candidate and token reconciliation decides attribution.
pub fn find_research_candidate(
    notifications: &[Notification],
    research_id: Option<i64>,
) -> Option<&Notification> {
    if let Some(id) = research_id {
        if let Some(n) = notifications
            .iter()
            .find(|n| n.metadata.research_id == Some(id) && n.research_outcome().is_some())
        {
            return Some(n);
        }
    }
    notifications.iter().find(|n| n.research_outcome().is_some())
}
