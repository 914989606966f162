use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use ward_core::model::{Admission, AdmissionStatus, DoctorOrder};
use ward_core::{AdmissionId, BedId};
use ward_engine::{AdmissionFilter, AdmitPatient, DueDose};
use ward_storage::Stored;

use super::{ApiResult, created, retry_on_conflict};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentActor};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatus {
    pub status: AdmissionStatus,
}

#[derive(Debug, Deserialize)]
pub struct Transfer {
    pub bed: BedId,
}

#[derive(Debug, Default, Deserialize)]
pub struct Discharge {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordDeath {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DueQuery {
    pub lookahead_minutes: Option<u32>,
}

pub async fn admit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(command): ApiJson<AdmitPatient>,
) -> Result<impl IntoResponse, ApiError> {
    let (engine, actor, command) = (&state.engine, &actor, &command);
    let admission = retry_on_conflict("admit", move || {
        engine.admissions().admit(actor, command.clone())
    })
    .await?;
    Ok(created(admission))
}

pub async fn list_admissions(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<AdmissionFilter>,
) -> ApiResult<Vec<Stored<Admission>>> {
    Ok(Json(state.engine.admissions().list(&filter).await?))
}

pub async fn get_admission(
    State(state): State<AppState>,
    Path(id): Path<AdmissionId>,
) -> ApiResult<Stored<Admission>> {
    Ok(Json(state.engine.admissions().get(&id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<AdmissionId>,
    ApiJson(body): ApiJson<UpdateStatus>,
) -> ApiResult<Stored<Admission>> {
    let (engine, actor, id) = (&state.engine, &actor, &id);
    let admission = retry_on_conflict("update_admission_status", move || {
        engine.admissions().update_status(actor, id, body.status)
    })
    .await?;
    Ok(Json(admission))
}

pub async fn transfer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<AdmissionId>,
    ApiJson(body): ApiJson<Transfer>,
) -> ApiResult<Stored<Admission>> {
    let (engine, actor, id, bed) = (&state.engine, &actor, &id, &body.bed);
    let admission = retry_on_conflict("transfer", move || {
        engine.admissions().transfer(actor, id, bed)
    })
    .await?;
    Ok(Json(admission))
}

pub async fn discharge(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<AdmissionId>,
    ApiJson(body): ApiJson<Discharge>,
) -> ApiResult<Stored<Admission>> {
    let (engine, actor, id, summary) = (&state.engine, &actor, &id, &body.summary);
    let admission = retry_on_conflict("discharge", move || {
        engine.admissions().discharge(actor, id, summary.clone())
    })
    .await?;
    Ok(Json(admission))
}

pub async fn record_death(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<AdmissionId>,
    ApiJson(body): ApiJson<RecordDeath>,
) -> ApiResult<Stored<Admission>> {
    let (engine, actor, id, notes) = (&state.engine, &actor, &id, &body.notes);
    let admission = retry_on_conflict("record_death", move || {
        engine.admissions().record_death(actor, id, notes.clone())
    })
    .await?;
    Ok(Json(admission))
}

pub async fn orders_for_admission(
    State(state): State<AppState>,
    Path(id): Path<AdmissionId>,
) -> ApiResult<Vec<Stored<DoctorOrder>>> {
    state.engine.admissions().get(&id).await?;
    Ok(Json(state.engine.orders().orders_for_admission(&id).await?))
}

/// Doses due within the lookahead window, overdue ones flagged.
pub async fn due_list(
    State(state): State<AppState>,
    Path(id): Path<AdmissionId>,
    ApiQuery(query): ApiQuery<DueQuery>,
) -> ApiResult<Vec<DueDose>> {
    let engine = &state.engine;
    let lookahead = match query.lookahead_minutes {
        Some(minutes) => time::Duration::minutes(i64::from(minutes)),
        None => engine.config().due_lookahead(),
    };
    Ok(Json(
        engine
            .orders()
            .due_list(&id, engine.now(), lookahead)
            .await?,
    ))
}
