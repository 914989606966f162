//! Domain events published after a transition commits.
//!
//! Workflows hand finished events to the [`EventBroadcaster`]; the
//! notification collaborator subscribes and delivers them. Sending never
//! fails the transition: with no subscribers the event is simply dropped.

pub mod broadcaster;
pub mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{WardEvent, WardEventType};
