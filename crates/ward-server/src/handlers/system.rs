use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;
use ward_storage::ChangeSet;

use super::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    #[serde(default)]
    pub since: u64,
}

/// Records written after `since`; poll again with the returned watermark.
pub async fn changes(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChangesQuery>,
) -> ApiResult<ChangeSet> {
    Ok(Json(state.engine.changes_since(query.since).await?))
}

#[derive(Debug, Serialize)]
pub struct Watermark {
    pub watermark: u64,
}

pub async fn watermark(State(state): State<AppState>) -> ApiResult<Watermark> {
    Ok(Json(Watermark {
        watermark: state.engine.watermark().await?,
    }))
}
