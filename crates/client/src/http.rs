//! `reqwest`-backed implementation of the console API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use outreach_core::{
    CampaignId, ContactId, Notification, NotificationFeed, ResearchId, find_campaign_candidate,
    find_dispatch_candidate, find_research_candidate,
};

use crate::api::{
    ApiError, CampaignSnapshot, ConsoleApi, ContactType, ResearchSnapshot, StartResearchResponse,
};

/// HTTP client for the console API.
///
/// Auth-token refresh and retry-on-401 live in the surrounding application;
/// this client attaches the bearer token it is given and maps transport
/// failures into [`ApiError`].
pub struct HttpConsoleApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpConsoleApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: Some(token.into()),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn fetch_notification_feed(&self) -> Result<NotificationFeed, ApiError> {
        self.send_json(self.request(reqwest::Method::GET, "/api/notifications"))
            .await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .send_json(self.request(
                reqwest::Method::POST,
                &format!("/api/notifications/{id}/read"),
            ))
            .await?;
        Ok(())
    }

    async fn start_bulk_research(
        &self,
        contact_ids: &[ContactId],
        contact_type: ContactType,
        create_campaign: bool,
    ) -> Result<StartResearchResponse, ApiError> {
        let body = serde_json::json!({
            "contact_ids": contact_ids,
            "contact_type": contact_type,
            "create_campaign": create_campaign,
        });
        self.send_json(
            self.request(reqwest::Method::POST, "/api/research/bulk")
                .json(&body),
        )
        .await
    }

    // The check operations are client-side filtered (the server exposes no
    // scoped lookup): fetch the feed once, pick the candidate.

    async fn check_campaign_notifications(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Notification>, ApiError> {
        let feed = self.fetch_notification_feed().await?;
        Ok(find_campaign_candidate(&feed.notifications, campaign_id.value()).cloned())
    }

    async fn check_research_notifications(
        &self,
        research_id: ResearchId,
    ) -> Result<Option<Notification>, ApiError> {
        let feed = self.fetch_notification_feed().await?;
        Ok(find_research_candidate(&feed.notifications, Some(research_id.value())).cloned())
    }

    async fn check_dispatch_notifications(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Notification>, ApiError> {
        let feed = self.fetch_notification_feed().await?;
        Ok(find_dispatch_candidate(&feed.notifications, campaign_id.value()).cloned())
    }

    async fn poll_campaign_status(
        &self,
        campaign_id: CampaignId,
    ) -> Result<CampaignSnapshot, ApiError> {
        self.send_json(self.request(
            reqwest::Method::GET,
            &format!("/api/campaigns/{campaign_id}/status"),
        ))
        .await
    }

    async fn poll_research_status(
        &self,
        research_id: ResearchId,
    ) -> Result<ResearchSnapshot, ApiError> {
        self.send_json(self.request(
            reqwest::Method::GET,
            &format!("/api/research/{research_id}/status"),
        ))
        .await
    }
}
