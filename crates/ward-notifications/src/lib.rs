//! Delivery of ward events to people and systems outside the engine.
//!
//! [`EventDispatcher`] subscribes to the engine's event bus and queues one
//! [`Notification`] per configured channel. [`NotificationProcessor`] polls
//! the queue, renders templates and hands the result to a
//! [`NotificationAdapter`], retrying failures with exponential backoff.
//! Nothing here can fail an engine operation.

pub mod adapters;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod processor;
pub mod queue;
pub mod templates;
pub mod types;

pub use adapters::{LogAdapter, NotificationAdapter, RenderedContent, SendResult, WebhookAdapter};
pub use config::{NotificationConfig, WebhookConfig};
pub use dispatcher::EventDispatcher;
pub use error::NotificationError;
pub use processor::{NotificationProcessor, retry_delay};
pub use queue::{InMemoryNotificationQueue, NotificationQueue};
pub use templates::{Template, TemplateRenderer, event_data};
pub use types::*;
