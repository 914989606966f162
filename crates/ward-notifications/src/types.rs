use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;
use ward_core::{WardEventType, WardId};

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    /// Structured log line; always available.
    Log,
    Webhook,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Cancelled,
}

/// A notification about one ward event, queued for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub channel: NotificationChannel,
    pub status: NotificationStatus,

    pub event: WardEventType,
    pub ward: WardId,
    /// Id of the emergency or handover the event is about.
    pub subject_id: String,

    pub template_id: String,
    pub template_data: HashMap<String, serde_json::Value>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Earliest time of the next attempt (None = immediately)
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub next_attempt_at: Option<OffsetDateTime>,

    #[serde(with = "time::serde::rfc3339::option", default)]
    pub sent_at: Option<OffsetDateTime>,

    /// Last delivery error
    pub error: Option<String>,

    pub retry_count: u32,
}

impl Notification {
    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        self.status == NotificationStatus::Pending
            && self.next_attempt_at.is_none_or(|at| at <= now)
    }
}

/// Notification counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub pending: u32,
    pub sending: u32,
    pub sent: u32,
    pub failed: u32,
    pub cancelled: u32,
}
