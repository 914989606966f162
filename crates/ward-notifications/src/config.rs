//! `[notifications]` settings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::NotificationChannel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Every event is queued once per channel listed here.
    #[serde(default = "default_channels")]
    pub channels: Vec<NotificationChannel>,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts after the first before a notification is marked failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

fn default_enabled() -> bool {
    true
}

fn default_channels() -> Vec<NotificationChannel> {
    vec![NotificationChannel::Log]
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_batch_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    5
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            channels: default_channels(),
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            webhook: None,
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_secs == 0 {
            return Err("notifications.poll_interval_secs must be greater than zero".into());
        }
        if self.batch_size == 0 {
            return Err("notifications.batch_size must be greater than zero".into());
        }
        if self.channels.contains(&NotificationChannel::Webhook) {
            let Some(webhook) = &self.webhook else {
                return Err(
                    "notifications.webhook must be set when the webhook channel is enabled".into(),
                );
            };
            webhook.validate()?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    /// Signs payloads with HMAC-SHA256 when set.
    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(format!(
                "notifications.webhook.url must be an http(s) URL, got '{}'",
                self.url
            ));
        }
        if self.secret.as_deref().is_some_and(str::is_empty) {
            return Err("notifications.webhook.secret must not be empty".into());
        }
        Ok(())
    }
}
