//! Outbound messaging gateway.
//!
//! Client for the Z-API WhatsApp HTTP gateway. Sends are fire-and-forget
//! from the caller's perspective: a failure is surfaced in the result for
//! logging, never retried here.

use std::future::Future;

use relay_common::error::RelayError;

/// Rich-link attachment for [`Gateway::send_link`].
#[derive(Debug, Clone)]
pub struct LinkPreview {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

/// Abstraction over the outbound messaging transport.
pub trait Gateway: Send + Sync + 'static {
    /// Send a plain-text message to a dispatch-form phone number.
    fn send_text(
        &self,
        phone: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Send a message carrying a rich-link preview.
    fn send_link(
        &self,
        phone: &str,
        body: &str,
        link: &LinkPreview,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;
}

/// Z-API WhatsApp gateway client.
pub struct ZapiGateway {
    http: reqwest::Client,
    base_url: String,
}

impl ZapiGateway {
    pub fn new(http: reqwest::Client, instance: &str, token: &str) -> Self {
        Self {
            http,
            base_url: format!("https://api.z-api.io/instances/{instance}/token/{token}"),
        }
    }

    /// Point the client at a different base URL (test servers).
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn post(&self, path: &str, payload: serde_json::Value) -> Result<(), RelayError> {
        let resp = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Gateway(format!(
                "gateway returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

impl Gateway for ZapiGateway {
    async fn send_text(&self, phone: &str, body: &str) -> Result<(), RelayError> {
        self.post(
            "send-message",
            serde_json::json!({ "phone": phone, "message": body }),
        )
        .await
    }

    async fn send_link(
        &self,
        phone: &str,
        body: &str,
        link: &LinkPreview,
    ) -> Result<(), RelayError> {
        self.post(
            "send-link",
            serde_json::json!({
                "phone": phone,
                "message": body,
                "linkUrl": link.url,
                "title": link.title,
                "linkDescription": link.description,
                "image": link.image,
            }),
        )
        .await
    }
}
