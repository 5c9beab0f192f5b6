pub mod closure;
pub mod earnings;
pub mod health;
pub mod periods;
pub mod rates;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::RateSource;
use crate::error::AppError;
use crate::orchestration::{ClosureRunner, RateCorrector};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Resolve an optional millisecond override to an instant, defaulting to
/// the current time. Trigger and input endpoints accept the override for
/// backfill and deterministic testing.
pub(crate) fn resolve_now(now_ms: Option<i64>) -> Result<DateTime<Utc>, AppError> {
    match now_ms {
        None => Ok(Utc::now()),
        Some(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| AppError::BadRequest(format!("invalid nowMs: {}", ms))),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub runner: Arc<ClosureRunner>,
    pub corrector: Arc<RateCorrector>,
    pub rates: Arc<dyn RateSource>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        runner: Arc<ClosureRunner>,
        corrector: Arc<RateCorrector>,
        rates: Arc<dyn RateSource>,
    ) -> Self {
        Self {
            repo,
            config,
            runner,
            corrector,
            rates,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/earnings", post(earnings::record_earning))
        .route("/v1/earnings/current", get(earnings::get_current_earnings))
        .route("/v1/closure/early-freeze", post(closure::early_freeze))
        .route("/v1/closure/full-close", post(closure::full_close))
        .route("/v1/periods/recompute", post(periods::recompute_period))
        .route(
            "/v1/periods/:start/:half/records",
            get(periods::get_period_records),
        )
        .route("/v1/rates", get(rates::get_rates).put(rates::put_rates))
        .layer(cors)
        .with_state(state)
}
