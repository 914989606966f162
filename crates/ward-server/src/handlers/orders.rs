use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use ward_core::model::{
    AdministrationDetails, DoctorOrder, MedicationAdministration, MedicationSchedule, Regimen,
    SkipDisposition,
};
use ward_core::{AdministrationId, OrderId, ScheduleId};
use ward_engine::CreateOrder;
use ward_storage::Stored;

use super::{ApiResult, created, retry_on_conflict};
use crate::error::ApiError;
use crate::extract::{ApiJson, CurrentActor};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Reason {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SkipDose {
    pub reason: String,
    pub disposition: SkipDisposition,
}

pub async fn create_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(command): ApiJson<CreateOrder>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.engine.orders().create_order(&actor, command).await?;
    Ok(created(order))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> ApiResult<Stored<DoctorOrder>> {
    Ok(Json(state.engine.orders().get_order(&id).await?))
}

pub async fn hold_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<OrderId>,
) -> ApiResult<Stored<DoctorOrder>> {
    let (engine, actor, id) = (&state.engine, &actor, &id);
    let order = retry_on_conflict("hold_order", move || engine.orders().hold_order(actor, id)).await?;
    Ok(Json(order))
}

pub async fn resume_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<OrderId>,
) -> ApiResult<Stored<DoctorOrder>> {
    let (engine, actor, id) = (&state.engine, &actor, &id);
    let order =
        retry_on_conflict("resume_order", move || engine.orders().resume_order(actor, id)).await?;
    Ok(Json(order))
}

pub async fn complete_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<OrderId>,
) -> ApiResult<Stored<DoctorOrder>> {
    let (engine, actor, id) = (&state.engine, &actor, &id);
    let order = retry_on_conflict("complete_order", move || {
        engine.orders().complete_order(actor, id)
    })
    .await?;
    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<OrderId>,
    ApiJson(body): ApiJson<Reason>,
) -> ApiResult<Stored<DoctorOrder>> {
    let (engine, actor, id, reason) = (&state.engine, &actor, &id, body.reason.as_str());
    let order = retry_on_conflict("cancel_order", move || {
        engine.orders().cancel_order(actor, id, reason)
    })
    .await?;
    Ok(Json(order))
}

pub async fn schedule_medication(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<OrderId>,
    ApiJson(regimen): ApiJson<Regimen>,
) -> Result<impl IntoResponse, ApiError> {
    let (engine, actor, id, regimen) = (&state.engine, &actor, &id, &regimen);
    let scheduled = retry_on_conflict("schedule_medication", move || {
        engine.orders().schedule_medication(actor, id, regimen.clone())
    })
    .await?;
    Ok(created(scheduled))
}

pub async fn schedules_for_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> ApiResult<Vec<Stored<MedicationSchedule>>> {
    state.engine.orders().get_order(&id).await?;
    Ok(Json(state.engine.orders().schedules_for_order(&id).await?))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<ScheduleId>,
) -> ApiResult<Stored<MedicationSchedule>> {
    Ok(Json(state.engine.orders().get_schedule(&id).await?))
}

pub async fn cancel_schedule(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<ScheduleId>,
    ApiJson(body): ApiJson<Reason>,
) -> ApiResult<Stored<MedicationSchedule>> {
    let (engine, actor, id, reason) = (&state.engine, &actor, &id, body.reason.as_str());
    let schedule = retry_on_conflict("cancel_schedule", move || {
        engine.orders().cancel_schedule(actor, id, reason)
    })
    .await?;
    Ok(Json(schedule))
}

pub async fn administrations_for_schedule(
    State(state): State<AppState>,
    Path(id): Path<ScheduleId>,
) -> ApiResult<Vec<Stored<MedicationAdministration>>> {
    state.engine.orders().get_schedule(&id).await?;
    Ok(Json(
        state.engine.orders().administrations_for_schedule(&id).await?,
    ))
}

pub async fn get_administration(
    State(state): State<AppState>,
    Path(id): Path<AdministrationId>,
) -> ApiResult<Stored<MedicationAdministration>> {
    Ok(Json(state.engine.orders().get_administration(&id).await?))
}

pub async fn administer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<AdministrationId>,
    ApiJson(details): ApiJson<AdministrationDetails>,
) -> ApiResult<Stored<MedicationAdministration>> {
    let (engine, actor, id, details) = (&state.engine, &actor, &id, &details);
    let administration = retry_on_conflict("administer", move || {
        engine.orders().administer(actor, id, details.clone())
    })
    .await?;
    Ok(Json(administration))
}

pub async fn skip(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<AdministrationId>,
    ApiJson(body): ApiJson<SkipDose>,
) -> ApiResult<Stored<MedicationAdministration>> {
    let (engine, actor, id, reason) = (&state.engine, &actor, &id, body.reason.as_str());
    let disposition = body.disposition;
    let administration = retry_on_conflict("skip_dose", move || {
        engine.orders().skip(actor, id, reason, disposition)
    })
    .await?;
    Ok(Json(administration))
}
