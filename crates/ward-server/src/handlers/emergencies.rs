use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use ward_core::model::{EmergencyEvent, Role};
use ward_core::{EmergencyId, WardId};
use ward_engine::RaiseEmergency;
use ward_storage::Stored;

use super::{ApiResult, created, retry_on_conflict};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentActor};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct Notes {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Escalate {
    pub reason: String,
    /// Defaults to the configured target for the event's severity.
    #[serde(default)]
    pub target: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct Resolve {
    pub outcome: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmergencyQuery {
    /// Only events past their escalation budget.
    #[serde(default)]
    pub overdue: bool,
}

pub async fn raise(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(command): ApiJson<RaiseEmergency>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.engine.emergencies().raise(&actor, command).await?;
    Ok(created(event))
}

/// Open emergencies across the station.
pub async fn list_open(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmergencyQuery>,
) -> ApiResult<Vec<Stored<EmergencyEvent>>> {
    let emergencies = state.engine.emergencies();
    let events = if query.overdue {
        emergencies.overdue(state.engine.now()).await?
    } else {
        emergencies.open().await?
    };
    Ok(Json(events))
}

pub async fn for_ward(
    State(state): State<AppState>,
    Path(ward): Path<WardId>,
) -> ApiResult<Vec<Stored<EmergencyEvent>>> {
    Ok(Json(state.engine.emergencies().for_ward(&ward).await?))
}

pub async fn get_emergency(
    State(state): State<AppState>,
    Path(id): Path<EmergencyId>,
) -> ApiResult<Stored<EmergencyEvent>> {
    Ok(Json(state.engine.emergencies().get(&id).await?))
}

pub async fn acknowledge(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<EmergencyId>,
    ApiJson(body): ApiJson<Notes>,
) -> ApiResult<Stored<EmergencyEvent>> {
    let (engine, actor, id, notes) = (&state.engine, &actor, &id, &body.notes);
    let event = retry_on_conflict("acknowledge_emergency", move || {
        engine.emergencies().acknowledge(actor, id, notes.clone())
    })
    .await?;
    Ok(Json(event))
}

pub async fn escalate(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<EmergencyId>,
    ApiJson(body): ApiJson<Escalate>,
) -> ApiResult<Stored<EmergencyEvent>> {
    let (engine, actor, id, reason) = (&state.engine, &actor, &id, body.reason.as_str());
    let target = body.target;
    let event = retry_on_conflict("escalate_emergency", move || {
        engine.emergencies().escalate(actor, id, reason, target)
    })
    .await?;
    Ok(Json(event))
}

pub async fn respond(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<EmergencyId>,
    ApiJson(body): ApiJson<Notes>,
) -> ApiResult<Stored<EmergencyEvent>> {
    let (engine, actor, id, notes) = (&state.engine, &actor, &id, &body.notes);
    let event = retry_on_conflict("respond_emergency", move || {
        engine.emergencies().respond(actor, id, notes.clone())
    })
    .await?;
    Ok(Json(event))
}

pub async fn resolve(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<EmergencyId>,
    ApiJson(body): ApiJson<Resolve>,
) -> ApiResult<Stored<EmergencyEvent>> {
    let (engine, actor, id, outcome) = (&state.engine, &actor, &id, body.outcome.as_str());
    let event = retry_on_conflict("resolve_emergency", move || {
        engine.emergencies().resolve(actor, id, outcome)
    })
    .await?;
    Ok(Json(event))
}
