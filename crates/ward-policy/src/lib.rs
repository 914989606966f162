//! Access policy for ward operations.
//!
//! Every mutating workflow asks [`AccessPolicy::require`] before it reads or
//! writes anything. The role table is static and immutable; there is no
//! per-request or per-ward override.

pub mod action;
pub mod engine;

pub use action::Action;
pub use engine::{AccessDecision, AccessPolicy, DEFAULT_POLICY, DenyReason, PolicyTable};
