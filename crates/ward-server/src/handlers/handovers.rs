use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use ward_core::model::{HandoverContent, HandoverRecord};
use ward_core::{HandoverId, WardId};
use ward_engine::CreateHandover;
use ward_storage::Stored;

use super::{ApiResult, created, retry_on_conflict};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentActor};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HandoverQuery {
    /// Hide records that a correction has superseded.
    #[serde(default)]
    pub current: bool,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(command): ApiJson<CreateHandover>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.engine.handovers().create(&actor, command).await?;
    Ok(created(record))
}

/// Publishes a new record superseding `id`; the original is never edited.
pub async fn correct(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<HandoverId>,
    ApiJson(content): ApiJson<HandoverContent>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .engine
        .handovers()
        .correct(&actor, &id, content)
        .await?;
    Ok(created(record))
}

pub async fn for_ward(
    State(state): State<AppState>,
    Path(ward): Path<WardId>,
    ApiQuery(query): ApiQuery<HandoverQuery>,
) -> ApiResult<Vec<Stored<HandoverRecord>>> {
    let handovers = state.engine.handovers();
    let records = if query.current {
        handovers.current_for_ward(&ward).await?
    } else {
        handovers.for_ward(&ward).await?
    };
    Ok(Json(records))
}

pub async fn get_handover(
    State(state): State<AppState>,
    Path(id): Path<HandoverId>,
) -> ApiResult<Stored<HandoverRecord>> {
    Ok(Json(state.engine.handovers().get(&id).await?))
}

pub async fn acknowledge(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<HandoverId>,
) -> ApiResult<Stored<HandoverRecord>> {
    let (engine, actor, id) = (&state.engine, &actor, &id);
    let record = retry_on_conflict("acknowledge_handover", move || {
        engine.handovers().acknowledge(actor, id)
    })
    .await?;
    Ok(Json(record))
}

pub async fn review(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<HandoverId>,
    ApiJson(body): ApiJson<Review>,
) -> ApiResult<Stored<HandoverRecord>> {
    let (engine, actor, id, notes) = (&state.engine, &actor, &id, &body.notes);
    let record = retry_on_conflict("review_handover", move || {
        engine.handovers().review(actor, id, notes.clone())
    })
    .await?;
    Ok(Json(record))
}
