//! Route handlers, one module per workflow.
//!
//! Mutating handlers run the engine call through [`retry_on_conflict`], so a
//! lost optimistic-concurrency race is retried once against fresh state
//! before the conflict reaches the client.

pub mod admissions;
pub mod beds;
pub mod emergencies;
pub mod handovers;
pub mod orders;
pub mod supplies;
pub mod system;

use std::future::Future;

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use ward_core::WardError;

use crate::error::ApiError;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub(crate) async fn retry_on_conflict<T, F, Fut>(op: &'static str, mut call: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WardError>>,
{
    match call().await {
        Err(err) if err.is_retryable() => {
            tracing::debug!(op, error = %err, "retrying after concurrency conflict");
            Ok(call().await?)
        }
        other => Ok(other?),
    }
}

pub(crate) fn created<T: Serialize>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use ward_core::EntityKind;

    #[tokio::test]
    async fn test_conflict_retried_once() {
        let calls = &AtomicU32::new(0);
        let result = retry_on_conflict("test", move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(WardError::conflict(EntityKind::Bed, "b-1")),
                _ => Ok(7),
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_conflict_surfaces() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), ApiError> = retry_on_conflict("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WardError::conflict(EntityKind::Bed, "b-1"))
        })
        .await;
        assert_eq!(result.unwrap_err().status_code(), StatusCode::CONFLICT);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_domain_errors_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), ApiError> = retry_on_conflict("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WardError::validation("nope"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
