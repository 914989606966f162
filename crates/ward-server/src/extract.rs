//! Request extractors: the acting staff member and JSON bodies that fail
//! with [`ApiError`].

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use ward_core::{Actor, Role, StaffId, validate_id};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// `Json<T>` whose rejection renders as an [`ApiError`] body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query<T>` whose rejection renders as an [`ApiError`] body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The staff member named by the `x-actor-id` / `x-actor-role` headers.
///
/// Identity is established upstream; the pair is trusted as given. The
/// `system` role is reserved for the sweep and is refused here.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<String, ApiError> {
            parts
                .headers
                .get(name)
                .ok_or_else(|| ApiError::unauthorized(format!("missing {name} header")))?
                .to_str()
                .map(|v| v.trim().to_string())
                .map_err(|_| ApiError::unauthorized(format!("{name} header is not valid text")))
        };

        let id = header(ACTOR_ID_HEADER)?;
        validate_id(&id).map_err(|e| ApiError::unauthorized(format!("invalid {ACTOR_ID_HEADER}: {e}")))?;

        let role: Role = header(ACTOR_ROLE_HEADER)?
            .parse()
            .map_err(|_| ApiError::unauthorized(format!("unknown {ACTOR_ROLE_HEADER}")))?;
        if role == Role::System {
            return Err(ApiError::unauthorized("the system role cannot be used over HTTP"));
        }

        Ok(Self(Actor::new(StaffId::new(id), role)))
    }
}
