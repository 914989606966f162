pub mod log;
pub mod webhook;

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::types::{Notification, NotificationChannel};

/// Result of sending a notification
#[derive(Debug)]
pub struct SendResult {
    pub success: bool,
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn delivered() -> Self {
        Self {
            success: true,
            external_id: None,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            external_id: None,
            error: Some(error.into()),
        }
    }
}

/// Rendered notification content
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedContent {
    pub subject: Option<String>,
    pub body: String,
}

/// Delivers rendered notifications over one channel.
///
/// `Err` means the attempt could not be made (transport error); a
/// `SendResult` with `success == false` means the receiver refused it.
/// The processor retries both.
#[async_trait]
pub trait NotificationAdapter: Send + Sync {
    async fn send(
        &self,
        notification: &Notification,
        rendered_content: &RenderedContent,
    ) -> Result<SendResult, NotificationError>;

    fn channel(&self) -> NotificationChannel;
}

pub use log::LogAdapter;
pub use webhook::WebhookAdapter;
