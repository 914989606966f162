use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::error::NotificationError;
use crate::types::{Notification, NotificationStats, NotificationStatus};

/// Storage for queued notifications
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Add a notification to the queue
    async fn enqueue(&self, notification: &Notification) -> Result<(), NotificationError>;

    async fn get(&self, id: &str) -> Result<Option<Notification>, NotificationError>;

    async fn update_status(
        &self,
        id: &str,
        status: NotificationStatus,
        error: Option<&str>,
    ) -> Result<(), NotificationError>;

    async fn mark_sent(&self, id: &str, at: OffsetDateTime) -> Result<(), NotificationError>;

    /// Put a notification back to pending until `next_attempt`, counting one retry.
    async fn schedule_retry(
        &self,
        id: &str,
        next_attempt: OffsetDateTime,
        error: &str,
    ) -> Result<(), NotificationError>;

    /// Pending notifications whose next attempt is due at `now`, oldest first.
    async fn fetch_due(
        &self,
        now: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationError>;

    /// Cancel a pending notification. Returns false if it was not pending.
    async fn cancel(&self, id: &str) -> Result<bool, NotificationError>;

    /// Reset a failed notification to pending with a fresh retry count.
    async fn restart(&self, id: &str) -> Result<bool, NotificationError>;

    async fn restart_all_failed(&self) -> Result<u32, NotificationError>;

    async fn list_by_status(
        &self,
        status: NotificationStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Notification>, NotificationError>;

    async fn stats(&self) -> Result<NotificationStats, NotificationError>;
}

/// Process-local queue. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryNotificationQueue {
    entries: DashMap<String, Notification>,
}

impl InMemoryNotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn modify<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Notification) -> R,
    ) -> Result<R, NotificationError> {
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| NotificationError::NotFound(id.to_string()))?;
        Ok(f(entry.value_mut()))
    }

    fn sorted(&self, predicate: impl Fn(&Notification) -> bool) -> Vec<Notification> {
        let mut matching: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        matching
    }
}

#[async_trait]
impl NotificationQueue for InMemoryNotificationQueue {
    async fn enqueue(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.entries.contains_key(&notification.id) {
            return Err(NotificationError::Internal(format!(
                "notification {} already queued",
                notification.id
            )));
        }
        self.entries
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Notification>, NotificationError> {
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    async fn update_status(
        &self,
        id: &str,
        status: NotificationStatus,
        error: Option<&str>,
    ) -> Result<(), NotificationError> {
        self.modify(id, |n| {
            n.status = status;
            if let Some(error) = error {
                n.error = Some(error.to_string());
            }
        })
    }

    async fn mark_sent(&self, id: &str, at: OffsetDateTime) -> Result<(), NotificationError> {
        self.modify(id, |n| {
            n.status = NotificationStatus::Sent;
            n.sent_at = Some(at);
            n.next_attempt_at = None;
            n.error = None;
        })
    }

    async fn schedule_retry(
        &self,
        id: &str,
        next_attempt: OffsetDateTime,
        error: &str,
    ) -> Result<(), NotificationError> {
        self.modify(id, |n| {
            n.status = NotificationStatus::Pending;
            n.retry_count += 1;
            n.next_attempt_at = Some(next_attempt);
            n.error = Some(error.to_string());
        })
    }

    async fn fetch_due(
        &self,
        now: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut due = self.sorted(|n| n.is_due(now));
        due.truncate(limit);
        Ok(due)
    }

    async fn cancel(&self, id: &str) -> Result<bool, NotificationError> {
        self.modify(id, |n| {
            if n.status != NotificationStatus::Pending {
                return false;
            }
            n.status = NotificationStatus::Cancelled;
            true
        })
    }

    async fn restart(&self, id: &str) -> Result<bool, NotificationError> {
        self.modify(id, |n| {
            if n.status != NotificationStatus::Failed {
                return false;
            }
            n.status = NotificationStatus::Pending;
            n.retry_count = 0;
            n.next_attempt_at = None;
            n.error = None;
            true
        })
    }

    async fn restart_all_failed(&self) -> Result<u32, NotificationError> {
        let failed = self.sorted(|n| n.status == NotificationStatus::Failed);
        let mut restarted = 0;
        for notification in failed {
            if self.restart(&notification.id).await? {
                restarted += 1;
            }
        }
        Ok(restarted)
    }

    async fn list_by_status(
        &self,
        status: NotificationStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Notification>, NotificationError> {
        Ok(self
            .sorted(|n| n.status == status)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn stats(&self) -> Result<NotificationStats, NotificationError> {
        let mut stats = NotificationStats::default();
        for entry in self.entries.iter() {
            match entry.value().status {
                NotificationStatus::Pending => stats.pending += 1,
                NotificationStatus::Sending => stats.sending += 1,
                NotificationStatus::Sent => stats.sent += 1,
                NotificationStatus::Failed => stats.failed += 1,
                NotificationStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationChannel;
    use std::collections::HashMap;
    use time::Duration;
    use time::macros::datetime;
    use ward_core::{WardEventType, WardId};

    fn notification(id: &str, created_at: OffsetDateTime) -> Notification {
        Notification {
            id: id.to_string(),
            channel: NotificationChannel::Log,
            status: NotificationStatus::Pending,
            event: WardEventType::EmergencyRaised,
            ward: WardId::new("ward-a"),
            subject_id: "em-1".into(),
            template_id: "emergency_raised".into(),
            template_data: HashMap::new(),
            created_at,
            next_attempt_at: None,
            sent_at: None,
            error: None,
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn test_fetch_due_orders_by_creation_and_honours_retry_time() {
        let queue = InMemoryNotificationQueue::new();
        let t0 = datetime!(2024-03-01 08:00:00 UTC);
        queue.enqueue(&notification("b", t0 + Duration::seconds(1))).await.unwrap();
        queue.enqueue(&notification("a", t0)).await.unwrap();
        queue.enqueue(&notification("c", t0 + Duration::seconds(2))).await.unwrap();
        queue
            .schedule_retry("c", t0 + Duration::minutes(1), "timeout")
            .await
            .unwrap();

        let due = queue.fetch_due(t0 + Duration::seconds(5), 10).await.unwrap();
        let ids: Vec<_> = due.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let due = queue.fetch_due(t0 + Duration::minutes(1), 1).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "a");
        assert_eq!(queue.get("c").await.unwrap().unwrap().retry_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_rejected() {
        let queue = InMemoryNotificationQueue::new();
        let n = notification("a", datetime!(2024-03-01 08:00:00 UTC));
        queue.enqueue(&n).await.unwrap();
        assert!(queue.enqueue(&n).await.is_err());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let queue = InMemoryNotificationQueue::new();
        let at = datetime!(2024-03-01 08:00:00 UTC);
        queue.enqueue(&notification("a", at)).await.unwrap();
        queue.enqueue(&notification("b", at)).await.unwrap();
        queue.mark_sent("b", at).await.unwrap();

        assert!(queue.cancel("a").await.unwrap());
        assert!(!queue.cancel("a").await.unwrap());
        assert!(!queue.cancel("b").await.unwrap());
        assert!(matches!(
            queue.cancel("missing").await,
            Err(NotificationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_restart_failed_and_stats() {
        let queue = InMemoryNotificationQueue::new();
        let at = datetime!(2024-03-01 08:00:00 UTC);
        for id in ["a", "b", "c"] {
            queue.enqueue(&notification(id, at)).await.unwrap();
        }
        queue
            .update_status("a", NotificationStatus::Failed, Some("boom"))
            .await
            .unwrap();
        queue
            .update_status("b", NotificationStatus::Failed, Some("boom"))
            .await
            .unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!((stats.pending, stats.failed), (1, 2));

        assert_eq!(queue.restart_all_failed().await.unwrap(), 2);
        let a = queue.get("a").await.unwrap().unwrap();
        assert_eq!(a.status, NotificationStatus::Pending);
        assert!(a.error.is_none());
        assert_eq!(queue.stats().await.unwrap().pending, 3);
    }

    #[tokio::test]
    async fn test_list_by_status_pages() {
        let queue = InMemoryNotificationQueue::new();
        let t0 = datetime!(2024-03-01 08:00:00 UTC);
        for i in 0..5 {
            queue
                .enqueue(&notification(&format!("n{i}"), t0 + Duration::seconds(i)))
                .await
                .unwrap();
        }
        let page = queue
            .list_by_status(NotificationStatus::Pending, 2, 2)
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n3"]);
    }
}
