//! Rate provider: read-only lookup of the active conversion rates.

use crate::db::Repository;
use crate::domain::RateSet;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Source of the currently active conversion rates.
///
/// Implementations are read-only from the closure engine's perspective;
/// changing rates is an administrative action elsewhere.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// The rates in force right now. Never fails soft: when no active
    /// rate set exists, implementations fall back to the documented
    /// defaults so billing can proceed with a best-effort rate.
    async fn active_rates(&self) -> Result<RateSet, sqlx::Error>;
}

/// Database-backed provider reading the single active rate set row.
pub struct DbRateProvider {
    repo: Arc<Repository>,
}

impl DbRateProvider {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl RateSource for DbRateProvider {
    async fn active_rates(&self) -> Result<RateSet, sqlx::Error> {
        match self.repo.get_active_rate_set().await? {
            Some(rates) => Ok(rates),
            None => {
                warn!("no active rate set found, falling back to default rates");
                Ok(RateSet::fallback())
            }
        }
    }
}

/// Fixed in-memory provider for tests and offline tooling.
pub struct FixedRateProvider {
    rates: RateSet,
}

impl FixedRateProvider {
    pub fn new(rates: RateSet) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl RateSource for FixedRateProvider {
    async fn active_rates(&self) -> Result<RateSet, sqlx::Error> {
        Ok(self.rates)
    }
}
