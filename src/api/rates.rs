use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Money, RateSet, TimeMs};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesResponse {
    pub rates: RateSet,
    /// False when no rate set is active and the documented defaults are
    /// being served.
    pub active: bool,
}

pub async fn get_rates(State(state): State<AppState>) -> Result<Json<RatesResponse>, AppError> {
    match state.repo.get_active_rate_set().await? {
        Some(rates) => Ok(Json(RatesResponse {
            rates,
            active: true,
        })),
        None => Ok(Json(RatesResponse {
            rates: RateSet::fallback(),
            active: false,
        })),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRatesRequest {
    pub eur_usd: String,
    pub gbp_usd: String,
    pub usd_cop: String,
}

fn parse_positive_rate(field: &str, raw: &str) -> Result<Money, AppError> {
    let rate = Money::from_str_canonical(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("invalid {}: {}", field, raw)))?;
    if !rate.is_positive() {
        return Err(AppError::BadRequest(format!(
            "{} must be positive, got {}",
            field, raw
        )));
    }
    Ok(rate)
}

/// Replace the active rate set. Administrative action; does not contend
/// with closure, which copies whatever is active at invocation time.
pub async fn put_rates(
    State(state): State<AppState>,
    Json(request): Json<PutRatesRequest>,
) -> Result<Json<RatesResponse>, AppError> {
    let rates = RateSet {
        eur_usd: parse_positive_rate("eurUsd", &request.eur_usd)?,
        gbp_usd: parse_positive_rate("gbpUsd", &request.gbp_usd)?,
        usd_cop: parse_positive_rate("usdCop", &request.usd_cop)?,
    };

    state
        .repo
        .replace_active_rate_set(&rates, TimeMs::now())
        .await?;

    Ok(Json(RatesResponse {
        rates,
        active: true,
    }))
}
