use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;
use ward_core::clock::format_rfc3339;

use super::{NotificationAdapter, RenderedContent, SendResult};
use crate::config::WebhookConfig;
use crate::error::NotificationError;
use crate::types::{Notification, NotificationChannel};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex hmac>` of the request body.
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

/// POSTs a JSON payload per notification to the configured URL.
pub struct WebhookAdapter {
    http_client: Client,
    config: WebhookConfig,
}

impl WebhookAdapter {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }

    pub fn with_client(config: WebhookConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn sign_payload(&self, payload: &str, secret: &str) -> Result<String, NotificationError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotificationError::invalid_config(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn payload(notification: &Notification, content: &RenderedContent) -> serde_json::Value {
        json!({
            "notification_id": notification.id,
            "event": notification.event,
            "ward": notification.ward,
            "subject_id": notification.subject_id,
            "template_id": notification.template_id,
            "content": {
                "subject": content.subject,
                "body": content.body
            },
            "data": notification.template_data,
            "created_at": format_rfc3339(notification.created_at),
            "attempt": notification.retry_count + 1
        })
    }
}

impl std::fmt::Debug for WebhookAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAdapter")
            .field("url", &self.config.url)
            .field("signed", &self.config.secret.is_some())
            .finish()
    }
}

#[async_trait]
impl NotificationAdapter for WebhookAdapter {
    async fn send(
        &self,
        notification: &Notification,
        content: &RenderedContent,
    ) -> Result<SendResult, NotificationError> {
        let payload_str = serde_json::to_string(&Self::payload(notification, content))
            .map_err(|e| NotificationError::send_failed(e.to_string()))?;

        let mut request = self
            .http_client
            .post(&self.config.url)
            .header("Content-Type", "application/json");

        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        if let Some(secret) = &self.config.secret {
            let signature = self.sign_payload(&payload_str, secret)?;
            request = request.header(SIGNATURE_HEADER, format!("sha256={}", signature));
        }

        let response = request
            .body(payload_str)
            .send()
            .await
            .map_err(|e| NotificationError::send_failed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(SendResult::delivered())
        } else {
            let error = response.text().await.unwrap_or_default();
            Ok(SendResult::rejected(format!(
                "Webhook failed with {}: {}",
                status, error
            )))
        }
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Webhook
    }
}
