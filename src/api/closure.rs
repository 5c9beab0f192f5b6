use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::{resolve_now, AppState};
use crate::error::AppError;
use crate::orchestration::{ClosureRunReport, FreezeReport};

/// Scheduler trigger body. `nowMs` overrides the evaluation instant for
/// backfill and testing; production triggers send an empty body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub now_ms: Option<i64>,
}

pub async fn early_freeze(
    State(state): State<AppState>,
    body: Option<Json<TriggerRequest>>,
) -> Result<Json<FreezeReport>, AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let now = resolve_now(request.now_ms)?;
    let report = state.runner.early_freeze(now).await?;
    Ok(Json(report))
}

pub async fn full_close(
    State(state): State<AppState>,
    body: Option<Json<TriggerRequest>>,
) -> Result<Json<ClosureRunReport>, AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let now = resolve_now(request.now_ms)?;
    let report = state.runner.full_close(now).await?;
    Ok(Json(report))
}
