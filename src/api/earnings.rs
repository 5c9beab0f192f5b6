use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{resolve_now, AppState};
use crate::domain::{
    resolve_survivors, Currency, Money, ModelId, Period, Platform, TimeMs, WorkingEntry,
};
use crate::engine::{clock, compute_derived_values, RateSource};
use crate::error::AppError;

fn parse_model(input: &str) -> Result<ModelId, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("model must not be empty".to_string()));
    }
    Ok(ModelId::new(trimmed.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEarningRequest {
    pub model: String,
    pub platform: String,
    pub currency: String,
    pub raw_value: String,
    pub now_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEarningResponse {
    pub model: ModelId,
    pub platform: Platform,
    pub period: Period,
    pub raw_value: Money,
    pub recorded_at_ms: i64,
}

pub async fn record_earning(
    State(state): State<AppState>,
    Json(request): Json<RecordEarningRequest>,
) -> Result<Json<RecordEarningResponse>, AppError> {
    let model = parse_model(&request.model)?;
    let platform = Platform::from_slug(request.platform.trim());
    let currency = Currency::parse(&request.currency)
        .ok_or_else(|| AppError::BadRequest(format!("unknown currency: {}", request.currency)))?;
    let raw_value = Money::from_str_canonical(request.raw_value.trim())
        .map_err(|_| AppError::BadRequest(format!("invalid rawValue: {}", request.raw_value)))?;

    let now = resolve_now(request.now_ms)?;
    let period = clock::resolve_period(now);
    let recorded_at_ms = TimeMs::new(now.timestamp_millis());

    let entry = WorkingEntry {
        model: model.clone(),
        platform: platform.clone(),
        currency,
        raw_value,
        period,
        recorded_at_ms,
    };
    state.repo.insert_working_entry(&entry).await?;

    Ok(Json(RecordEarningResponse {
        model,
        platform,
        period,
        raw_value,
        recorded_at_ms: recorded_at_ms.as_ms(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentEarningsQuery {
    pub model: String,
    pub now_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningLine {
    pub platform: Platform,
    pub currency: Currency,
    pub raw_value: Money,
    pub gross_usd: Money,
    pub model_usd: Money,
    pub model_local: Money,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentEarningsResponse {
    pub model: ModelId,
    pub period: Period,
    pub share_pct: Money,
    pub lines: Vec<EarningLine>,
    pub total_model_usd: Money,
    pub total_model_local: Money,
}

/// The live calculator view: the model's current working set valued with
/// the active rates. Read-only; nothing here mutates closure state.
pub async fn get_current_earnings(
    Query(params): Query<CurrentEarningsQuery>,
    State(state): State<AppState>,
) -> Result<Json<CurrentEarningsResponse>, AppError> {
    let model = parse_model(&params.model)?;
    let now = resolve_now(params.now_ms)?;
    let period = clock::resolve_period(now);

    let entries = state.repo.load_working_entries(&model, period).await?;
    let survivors = resolve_survivors(entries);

    let share_pct = state.config.model_shares.share_for(&model);
    let rates = state.rates.active_rates().await?;

    let mut total_model_usd = Money::zero();
    let mut total_model_local = Money::zero();
    let lines: Vec<EarningLine> = survivors
        .into_iter()
        .map(|entry| {
            let derived = compute_derived_values(
                entry.raw_value,
                entry.currency,
                &entry.platform,
                share_pct,
                &rates,
            );
            total_model_usd = total_model_usd + derived.model_usd;
            total_model_local = total_model_local + derived.model_local;
            EarningLine {
                platform: entry.platform,
                currency: entry.currency,
                raw_value: entry.raw_value,
                gross_usd: derived.gross_usd,
                model_usd: derived.model_usd,
                model_local: derived.model_local,
            }
        })
        .collect();

    Ok(Json(CurrentEarningsResponse {
        model,
        period,
        share_pct,
        lines,
        total_model_usd,
        total_model_local,
    }))
}
