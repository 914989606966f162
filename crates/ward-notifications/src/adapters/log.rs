use async_trait::async_trait;

use super::{NotificationAdapter, RenderedContent, SendResult};
use crate::error::NotificationError;
use crate::types::{Notification, NotificationChannel};

/// Writes notifications to the `ward_notifications` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAdapter;

impl LogAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationAdapter for LogAdapter {
    async fn send(
        &self,
        notification: &Notification,
        content: &RenderedContent,
    ) -> Result<SendResult, NotificationError> {
        tracing::info!(
            target: "ward_notifications",
            notification_id = %notification.id,
            event = %notification.event,
            ward = %notification.ward,
            subject = content.subject.as_deref().unwrap_or_default(),
            body = %content.body,
            "ward notification"
        );
        Ok(SendResult::delivered())
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Log
    }
}
