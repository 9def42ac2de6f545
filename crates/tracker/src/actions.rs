//! Job-start actions.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use outreach_client::{ApiError, ConsoleApi, ContactType};
use outreach_core::ContactId;

use crate::job::TrackedJob;
use crate::kinds::ResearchDetails;
use crate::registry::JobRegistry;

/// Why a bulk-research run could not be started/tracked.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StartResearchError {
    /// The server rejected the request.
    #[error("research request was rejected: {0}")]
    Rejected(String),
    /// The server accepted but returned no correlation token; the run cannot
    /// be tracked (a later notification would be unattributable).
    #[error("research started without a correlation token")]
    MissingToken,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Client-generated research job ids. The server does not know them; the
/// correlation token is what links a completion notification back. Seeded
/// from the clock so ids stay unique across restarts within a session's
/// lifetime, then strictly monotonic.
fn next_research_job_id() -> i64 {
    static NEXT: OnceLock<AtomicI64> = OnceLock::new();
    NEXT.get_or_init(|| AtomicI64::new(Utc::now().timestamp_millis()))
        .fetch_add(1, Ordering::SeqCst)
}

/// Start a bulk-research run and begin tracking it.
///
/// On success the returned id is the client-side job id now present in the
/// registry; the registry's monitor picks the job up on its next wake. On
/// any error nothing is inserted.
pub async fn start_bulk_research(
    api: &dyn ConsoleApi,
    registry: &JobRegistry<ResearchDetails>,
    contact_ids: &[ContactId],
    contact_type: ContactType,
    create_campaign: bool,
) -> Result<i64, StartResearchError> {
    let response = api
        .start_bulk_research(contact_ids, contact_type, create_campaign)
        .await?;

    if !response.success {
        return Err(StartResearchError::Rejected(
            response.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    let token = response.token.ok_or(StartResearchError::MissingToken)?;

    let job_id = next_research_job_id();
    let details = ResearchDetails {
        contact_count: contact_ids.len() as u32,
        create_campaign,
    };
    registry.add(TrackedJob::new(job_id, token, details));

    tracing::info!(
        job_id,
        contacts = contact_ids.len(),
        create_campaign,
        "bulk research started"
    );
    Ok(job_id)
}
