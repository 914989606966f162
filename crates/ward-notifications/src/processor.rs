use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info, warn};
use ward_core::SharedClock;

use crate::adapters::{LogAdapter, NotificationAdapter, WebhookAdapter};
use crate::config::NotificationConfig;
use crate::error::NotificationError;
use crate::queue::NotificationQueue;
use crate::templates::TemplateRenderer;
use crate::types::{Notification, NotificationChannel, NotificationStatus};

const DEFAULT_MAX_RETRIES: u32 = 5;

/// Wait before retry number `retry_count + 1`: 60s, 120s, 240s, 480s, 960s, ...
pub fn retry_delay(retry_count: u32) -> time::Duration {
    time::Duration::seconds(60 * 2_i64.pow(retry_count.min(16)))
}

/// Sends queued notifications through the adapter registered for their
/// channel, rescheduling failures with exponential backoff.
pub struct NotificationProcessor<Q>
where
    Q: NotificationQueue,
{
    queue: Arc<Q>,
    templates: Arc<TemplateRenderer>,
    adapters: HashMap<NotificationChannel, Arc<dyn NotificationAdapter>>,
    clock: SharedClock,
    max_retries: u32,
}

impl<Q> NotificationProcessor<Q>
where
    Q: NotificationQueue + 'static,
{
    /// Processor with only the log channel wired.
    pub fn new(queue: Arc<Q>, templates: Arc<TemplateRenderer>, clock: SharedClock) -> Self {
        Self {
            queue,
            templates,
            adapters: HashMap::new(),
            clock,
            max_retries: DEFAULT_MAX_RETRIES,
        }
        .with_adapter(Arc::new(LogAdapter::new()))
    }

    /// Processor wired for the channels in `config`.
    pub fn from_config(
        queue: Arc<Q>,
        templates: Arc<TemplateRenderer>,
        clock: SharedClock,
        config: &NotificationConfig,
    ) -> Self {
        let mut processor = Self::new(queue, templates, clock).with_max_retries(config.max_retries);
        if let Some(webhook) = &config.webhook {
            processor = processor.with_adapter(Arc::new(WebhookAdapter::new(webhook.clone())));
        }
        processor
    }

    /// Register `adapter` for its channel, replacing any previous one.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn NotificationAdapter>) -> Self {
        self.adapters.insert(adapter.channel(), adapter);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Poll the queue until `shutdown` flips to true.
    pub async fn run(
        &self,
        poll_interval: Duration,
        batch_size: usize,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(poll_interval);

        info!("Notification processor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.process_batch(batch_size).await {
                Ok(processed) => {
                    if processed > 0 {
                        info!(count = processed, "Processed notifications");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Error processing notifications");
                }
            }
        }

        info!("Notification processor stopped");
    }

    /// Attempt every due notification, up to `limit`. Returns how many were sent.
    pub async fn process_batch(&self, limit: usize) -> Result<u32, NotificationError> {
        let pending = self.queue.fetch_due(self.clock.now(), limit).await?;
        let mut processed = 0;

        for notification in pending {
            self.queue
                .update_status(&notification.id, NotificationStatus::Sending, None)
                .await?;

            match self.process_one(&notification).await {
                Ok(()) => {
                    self.queue
                        .mark_sent(&notification.id, self.clock.now())
                        .await?;
                    processed += 1;
                }
                Err(e) => self.record_failure(&notification, &e).await?,
            }
        }

        Ok(processed)
    }

    async fn record_failure(
        &self,
        notification: &Notification,
        failure: &NotificationError,
    ) -> Result<(), NotificationError> {
        let error_msg = failure.to_string();
        warn!(
            notification_id = %notification.id,
            channel = %notification.channel,
            error = %error_msg,
            retry_count = notification.retry_count,
            "Notification send failed"
        );

        if !failure.is_retryable() || notification.retry_count >= self.max_retries {
            self.queue
                .update_status(
                    &notification.id,
                    NotificationStatus::Failed,
                    Some(&error_msg),
                )
                .await?;
            warn!(
                notification_id = %notification.id,
                retries = notification.retry_count,
                "Notification permanently failed"
            );
        } else {
            let next_attempt = self.clock.now() + retry_delay(notification.retry_count);
            self.queue
                .schedule_retry(&notification.id, next_attempt, &error_msg)
                .await?;
        }
        Ok(())
    }

    async fn process_one(&self, notification: &Notification) -> Result<(), NotificationError> {
        let adapter = self.adapters.get(&notification.channel).ok_or_else(|| {
            NotificationError::ChannelNotConfigured(notification.channel.to_string())
        })?;

        let content = self
            .templates
            .render(&notification.template_id, &notification.template_data)?;

        let result = adapter.send(notification, &content).await?;

        if result.success {
            info!(
                notification_id = %notification.id,
                channel = %notification.channel,
                event = %notification.event,
                external_id = ?result.external_id,
                "Notification sent successfully"
            );
            Ok(())
        } else {
            Err(NotificationError::SendFailed(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles() {
        let delays: Vec<i64> = (0..5).map(|n| retry_delay(n).whole_seconds()).collect();
        assert_eq!(delays, vec![60, 120, 240, 480, 960]);
    }

    #[test]
    fn test_retry_delay_is_bounded() {
        assert_eq!(retry_delay(40), retry_delay(16));
    }
}
