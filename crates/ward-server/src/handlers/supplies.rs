use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use ward_core::model::SupplyRequest;
use ward_core::{SupplyRequestId, WardId};
use ward_engine::RequestSupply;
use ward_storage::Stored;

use super::{ApiResult, created, retry_on_conflict};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentActor};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CancelSupply {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplyQuery {
    /// Only open requests, most urgent first.
    #[serde(default)]
    pub pending: bool,
}

pub async fn request(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(command): ApiJson<RequestSupply>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state.engine.supplies().request(&actor, command).await?;
    Ok(created(request))
}

pub async fn for_ward(
    State(state): State<AppState>,
    Path(ward): Path<WardId>,
    ApiQuery(query): ApiQuery<SupplyQuery>,
) -> ApiResult<Vec<Stored<SupplyRequest>>> {
    let supplies = state.engine.supplies();
    let requests = if query.pending {
        supplies.pending_for_ward(&ward).await?
    } else {
        supplies.for_ward(&ward).await?
    };
    Ok(Json(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<SupplyRequestId>,
) -> ApiResult<Stored<SupplyRequest>> {
    Ok(Json(state.engine.supplies().get(&id).await?))
}

pub async fn fulfill(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<SupplyRequestId>,
) -> ApiResult<Stored<SupplyRequest>> {
    let (engine, actor, id) = (&state.engine, &actor, &id);
    let request =
        retry_on_conflict("fulfill_supply", move || engine.supplies().fulfill(actor, id)).await?;
    Ok(Json(request))
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<SupplyRequestId>,
    ApiJson(body): ApiJson<CancelSupply>,
) -> ApiResult<Stored<SupplyRequest>> {
    let (engine, actor, id, reason) = (&state.engine, &actor, &id, &body.reason);
    let request = retry_on_conflict("cancel_supply", move || {
        engine.supplies().cancel(actor, id, reason.clone())
    })
    .await?;
    Ok(Json(request))
}
