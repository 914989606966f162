use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use ward_core::model::{Bed, BedLocation, BedStatus};
use ward_core::{BedId, WardId};
use ward_engine::{BedFilter, OccupancySummary, OccupancyViolation};
use ward_storage::Stored;

use super::{ApiResult, created, retry_on_conflict};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentActor};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetBedStatus {
    pub status: BedStatus,
}

pub async fn create_bed(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(location): ApiJson<BedLocation>,
) -> Result<impl IntoResponse, ApiError> {
    let bed = state.engine.beds().create(&actor, location).await?;
    Ok(created(bed))
}

pub async fn list_beds(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<BedFilter>,
) -> ApiResult<Vec<Stored<Bed>>> {
    Ok(Json(state.engine.beds().list(&filter).await?))
}

pub async fn get_bed(State(state): State<AppState>, Path(id): Path<BedId>) -> ApiResult<Stored<Bed>> {
    Ok(Json(state.engine.beds().get(&id).await?))
}

pub async fn set_bed_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<BedId>,
    ApiJson(body): ApiJson<SetBedStatus>,
) -> ApiResult<Stored<Bed>> {
    let (engine, actor, id) = (&state.engine, &actor, &id);
    let bed = retry_on_conflict("set_bed_status", move || {
        engine.beds().set_status(actor, id, body.status)
    })
    .await?;
    Ok(Json(bed))
}

pub async fn occupancy_summary(
    State(state): State<AppState>,
    Path(ward): Path<WardId>,
) -> ApiResult<OccupancySummary> {
    Ok(Json(state.engine.beds().occupancy_summary(&ward).await?))
}

/// 200 with an empty list when bed occupancy and admissions agree.
pub async fn check_invariant(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<OccupancyViolation>>), ApiError> {
    let violations = state.engine.beds().check_invariant().await?;
    let status = if violations.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    Ok((status, Json(violations)))
}
