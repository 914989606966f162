use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use ward_core::{ErrorCategory, WardError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
    #[error(transparent)]
    Ward(#[from] WardError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ward(err) => match err.category() {
                ErrorCategory::Domain => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCategory::Access => StatusCode::FORBIDDEN,
                ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                ErrorCategory::Conflict => StatusCode::CONFLICT,
                ErrorCategory::Infrastructure => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    /// Stable code for the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Timeout(_) => "timeout",
            ApiError::Ward(err) => err.kind(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Timeout(_) => "The request took too long. Please try again.".to_string(),
            ApiError::Ward(err) => err.user_message(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({
            "error": self.kind(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_core::EntityKind;

    #[test]
    fn test_category_mapping() {
        let cases = [
            (WardError::bed_unavailable("b-1", "occupied"), StatusCode::UNPROCESSABLE_ENTITY),
            (WardError::validation("reason required"), StatusCode::UNPROCESSABLE_ENTITY),
            (WardError::Forbidden, StatusCode::FORBIDDEN),
            (WardError::not_found(EntityKind::Bed, "b-1"), StatusCode::NOT_FOUND),
            (WardError::conflict(EntityKind::Bed, "b-1"), StatusCode::CONFLICT),
            (WardError::collaborator("store down"), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
        assert_eq!(
            ApiError::unauthorized("missing x-actor-id").status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_forbidden_message_is_generic() {
        let err = ApiError::from(WardError::Forbidden);
        assert_eq!(err.kind(), "forbidden");
        assert_eq!(
            err.message(),
            "You do not have access to perform this action."
        );
    }
}
