//! HTTP client for the delivery platform's REST API.

use crate::backend::{
    LogisticsBackend, MerchantStatus, NearbyMerchant, NotificationReceipt, RouteEstimate,
};
use crate::ids;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use synapse_common::{Result, SynapseError};
use tracing::{debug, warn};

#[derive(Serialize)]
struct NotificationPayload<'a> {
    title: &'a str,
    message: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct NotificationResponse {
    message_id: String,
}

#[derive(Serialize)]
struct ReroutePayload<'a> {
    new_task_id: &'a str,
    reason: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search_results: Vec<NearbyMerchant>,
}

/// Backend that calls the platform over HTTP.
///
/// Endpoints, relative to `base_url`:
/// - `POST /users/{id}/notifications`
/// - `POST /drivers/{id}/reroute`
/// - `GET /routes/alternative?request=...`
/// - `GET /merchants/{id}/status`
/// - `GET /merchants/search?cuisine=...&max_wait_minutes=...&limit=...`
///
/// Ids come from directive text, so each one must be a plain identifier
/// and is always sent as a single percent-encoded path segment.
pub struct HttpBackend {
    base_url: Url,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .map_err(|e| SynapseError::Config(format!("Invalid platform URL '{base_url}': {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(SynapseError::Config(format!(
                "Platform URL '{base_url}' cannot carry a path"
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SynapseError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: parsed,
            api_key,
            http_client,
        })
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SynapseError::Config(format!("Platform URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn checked_id<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
        if ids::is_plain_reference(id) {
            Ok(id)
        } else {
            warn!(kind = %kind, "Refusing non-identifier in platform path");
            Err(SynapseError::Backend(format!(
                "{kind} id {id:?} is not a plain identifier"
            )))
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| SynapseError::Backend(format!("{what} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!(status = %status, what = %what, "Platform API returned an error");
            return Err(SynapseError::Backend(format!(
                "{what} failed with {status}: {body_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SynapseError::Backend(format!("{what} returned an unexpected body: {e}")))
    }
}

#[async_trait]
impl LogisticsBackend for HttpBackend {
    async fn send_notification(
        &self,
        recipient: &str,
        message: &str,
    ) -> Result<NotificationReceipt> {
        let recipient = Self::checked_id("recipient", recipient)?;
        let url = self.endpoint(&["users", recipient, "notifications"])?;
        debug!(url = %url, "Sending notification");

        let payload = NotificationPayload {
            title: "An update on your order",
            message,
            kind: "push_notification",
        };
        let response: NotificationResponse = self
            .send_json(self.http_client.post(url).json(&payload), "notification")
            .await?;

        Ok(NotificationReceipt {
            message_id: response.message_id,
        })
    }

    async fn find_route(&self, request: &str) -> Result<RouteEstimate> {
        let url = self.endpoint(&["routes", "alternative"])?;
        debug!(url = %url, "Requesting alternative route");
        self.send_json(
            self.http_client.get(url).query(&[("request", request)]),
            "route lookup",
        )
        .await
    }

    async fn reroute_driver(&self, driver_id: &str, reason: &str) -> Result<()> {
        let driver_id = Self::checked_id("driver", driver_id)?;
        let url = self.endpoint(&["drivers", driver_id, "reroute"])?;
        debug!(url = %url, "Rerouting driver");
        let payload = ReroutePayload {
            new_task_id: "alternative-route",
            reason,
        };
        let _: serde_json::Value = self
            .send_json(self.http_client.post(url).json(&payload), "reroute")
            .await?;
        Ok(())
    }

    async fn merchant_status(&self, merchant_id: &str) -> Result<MerchantStatus> {
        let merchant_id = Self::checked_id("merchant", merchant_id)?;
        let url = self.endpoint(&["merchants", merchant_id, "status"])?;
        debug!(url = %url, "Fetching merchant status");
        self.send_json(self.http_client.get(url), "merchant status")
            .await
    }

    async fn search_merchants(
        &self,
        cuisine: &str,
        max_wait_minutes: u32,
        limit: usize,
    ) -> Result<Vec<NearbyMerchant>> {
        let url = self.endpoint(&["merchants", "search"])?;
        debug!(url = %url, cuisine = %cuisine, max_wait_minutes, "Searching nearby merchants");
        let query = [
            ("cuisine", cuisine.to_string()),
            ("max_wait_minutes", max_wait_minutes.to_string()),
            ("limit", limit.to_string()),
        ];
        let response: SearchResponse = self
            .send_json(self.http_client.get(url).query(&query), "merchant search")
            .await?;
        Ok(response.search_results)
    }
}
