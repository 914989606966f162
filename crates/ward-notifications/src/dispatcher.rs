//! Turns committed ward events into queued notifications.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use ward_core::{SharedClock, WardEvent};

use crate::error::NotificationError;
use crate::queue::NotificationQueue;
use crate::templates::event_data;
use crate::types::{Notification, NotificationChannel, NotificationStatus};

pub struct EventDispatcher<Q>
where
    Q: NotificationQueue,
{
    queue: Arc<Q>,
    channels: Vec<NotificationChannel>,
    clock: SharedClock,
}

impl<Q> EventDispatcher<Q>
where
    Q: NotificationQueue + 'static,
{
    pub fn new(queue: Arc<Q>, channels: Vec<NotificationChannel>, clock: SharedClock) -> Self {
        Self {
            queue,
            channels,
            clock,
        }
    }

    /// One pending notification per configured channel.
    pub fn notifications_for(&self, event: &WardEvent, now: OffsetDateTime) -> Vec<Notification> {
        let data = event_data(event);
        self.channels
            .iter()
            .map(|channel| Notification {
                id: uuid::Uuid::new_v4().to_string(),
                channel: *channel,
                status: NotificationStatus::Pending,
                event: event.event_type(),
                ward: event.ward().clone(),
                subject_id: event.subject_id().to_string(),
                template_id: event.event_type().as_str().to_string(),
                template_data: data.clone(),
                created_at: now,
                next_attempt_at: None,
                sent_at: None,
                error: None,
                retry_count: 0,
            })
            .collect()
    }

    pub async fn dispatch(&self, event: &WardEvent) -> Result<Vec<Notification>, NotificationError> {
        let notifications = self.notifications_for(event, self.clock.now());
        for notification in &notifications {
            self.queue.enqueue(notification).await?;
        }
        tracing::debug!(
            event = %event.event_type(),
            subject_id = event.subject_id(),
            queued = notifications.len(),
            "ward event queued for delivery"
        );
        Ok(notifications)
    }

    /// Queue every event received until the channel closes.
    ///
    /// A lagging receiver loses the oldest events; that is logged and the
    /// loop carries on.
    pub async fn run(&self, mut events: broadcast::Receiver<WardEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = self.dispatch(&event).await {
                        tracing::warn!(
                            event = %event.event_type(),
                            subject_id = event.subject_id(),
                            error = %e,
                            "failed to queue ward event"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification dispatcher lagged behind ward events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::info!("notification dispatcher stopped");
    }
}
