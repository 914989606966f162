use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Channel not configured: {0}")]
    ChannelNotConfigured(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Failures worth another attempt later. Missing templates or channels
    /// will not fix themselves between retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SendFailed(_) | Self::Internal(_))
    }
}
