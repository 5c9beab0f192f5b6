use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{resolve_now, AppState};
use crate::domain::{ArchivedRecord, Money, ModelId, Period, RateOverrides, TimeMs};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeRequest {
    pub period_start: String,
    pub period_type: String,
    pub model: Option<String>,
    pub eur_usd: Option<String>,
    pub gbp_usd: Option<String>,
    pub usd_cop: Option<String>,
    pub now_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeResponse {
    pub period: Period,
    pub updated_count: usize,
}

fn parse_rate(field: &str, value: Option<&String>) -> Result<Option<Money>, AppError> {
    value
        .map(|raw| {
            Money::from_str_canonical(raw.trim())
                .map_err(|_| AppError::BadRequest(format!("invalid {}: {}", field, raw)))
        })
        .transpose()
}

/// Administrative rate correction on a closed period. Privilege checks
/// are enforced by the gateway in front of this service.
pub async fn recompute_period(
    State(state): State<AppState>,
    Json(request): Json<RecomputeRequest>,
) -> Result<Json<RecomputeResponse>, AppError> {
    let period = Period::parse(&request.period_start, &request.period_type)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let model = request
        .model
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ModelId::new(s.to_string()));

    let overrides = RateOverrides {
        eur_usd: parse_rate("eurUsd", request.eur_usd.as_ref())?,
        gbp_usd: parse_rate("gbpUsd", request.gbp_usd.as_ref())?,
        usd_cop: parse_rate("usdCop", request.usd_cop.as_ref())?,
    };

    let now = resolve_now(request.now_ms)?;
    let updated_count = state
        .corrector
        .recompute_closed_period(
            period,
            model.as_ref(),
            &overrides,
            TimeMs::new(now.timestamp_millis()),
        )
        .await?;

    Ok(Json(RecomputeResponse {
        period,
        updated_count,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRecordsQuery {
    pub model: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRecordsResponse {
    pub period: Period,
    pub records: Vec<ArchivedRecord>,
}

/// Archived ledger export for one period, as JSON or a CSV statement.
pub async fn get_period_records(
    Path((start, half)): Path<(String, String)>,
    Query(params): Query<PeriodRecordsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let period =
        Period::parse(&start, &half).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let model = params
        .model
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ModelId::new(s.to_string()));

    let records = state
        .repo
        .query_archived_records(period, model.as_ref())
        .await?;

    match params.format.as_deref().unwrap_or("json") {
        "json" => Ok(Json(PeriodRecordsResponse { period, records }).into_response()),
        "csv" => {
            let csv = records_to_csv(&records)
                .map_err(|e| AppError::Internal(format!("csv export failed: {}", e)))?;
            Ok((
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                csv,
            )
                .into_response())
        }
        other => Err(AppError::BadRequest(format!(
            "unknown format: {} (expected json or csv)",
            other
        ))),
    }
}

fn records_to_csv(records: &[ArchivedRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "model",
        "platform",
        "period_start",
        "period_type",
        "currency",
        "raw_value",
        "share_pct",
        "eur_usd_rate",
        "gbp_usd_rate",
        "usd_cop_rate",
        "gross_usd",
        "model_usd",
        "model_local",
        "archived_at_ms",
    ])?;

    for record in records {
        writer.write_record([
            record.model.as_str().to_string(),
            record.platform.slug().to_string(),
            record.period.start_str(),
            record.period.half.as_str().to_string(),
            record.currency.as_str().to_string(),
            record.raw_value.to_canonical_string(),
            record.share_pct.to_canonical_string(),
            record.rates.eur_usd.to_canonical_string(),
            record.rates.gbp_usd.to_canonical_string(),
            record.rates.usd_cop.to_canonical_string(),
            record.gross_usd.to_canonical_string(),
            record.model_usd.to_canonical_string(),
            record.model_local.to_canonical_string(),
            record.archived_at_ms.as_ms().to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
