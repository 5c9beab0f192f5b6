use anyhow::Context;
use camledger::engine::DbRateProvider;
use camledger::orchestration::{Archiver, ClosureRunner, RateCorrector};
use camledger::{api, config::Config, db::init_db, RateSource, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    // Initialize database and dependencies
    let pool = init_db(&config.database_path)
        .await
        .context("failed to initialize database")?;

    let repo = Arc::new(Repository::new(pool));
    let rates: Arc<dyn RateSource> = Arc::new(DbRateProvider::new(repo.clone()));
    let archiver = Arc::new(Archiver::new(
        repo.clone(),
        rates.clone(),
        config.model_shares.clone(),
    ));
    let runner = Arc::new(ClosureRunner::new(repo.clone(), archiver));
    let corrector = Arc::new(RateCorrector::new(repo.clone()));

    // Create router
    let app = api::create_router(api::AppState::new(repo, config, runner, corrector, rates));

    // Bind and serve
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
