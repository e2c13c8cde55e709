mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use outletdb_extract::{ExtractionClient, RetryPolicy};
use outletdb_ingest::{
    DatasetStore, MatrixCache, Orchestrator, OrchestratorConfig, PgDatasetStore, StalenessGate,
};
use outletdb_source::SourceClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    scheduler::IngestScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(outletdb_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = outletdb_db::PoolConfig::from_app_config(&config);
    let pool = outletdb_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = outletdb_db::run_migrations(&pool).await?;
    tracing::info!(applied, env = %config.env, "database ready");

    let source = SourceClient::new(&config.source_url, config.source_timeout_secs)
        .context("building source client")?;
    let retry = RetryPolicy {
        max_retries: config.extract_max_retries,
        backoff_base_ms: config.extract_retry_backoff_ms,
    };
    let extractor = ExtractionClient::new(
        &config.extract_endpoint,
        config.extract_api_key.as_deref(),
        retry.attempt_timeout_secs(config.extract_timeout_secs),
        retry,
    )
    .context("building extraction client")?;
    let store: Arc<dyn DatasetStore> = Arc::new(PgDatasetStore::new(pool.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(source),
        Arc::new(extractor),
        Arc::clone(&store),
        OrchestratorConfig::from_app_config(&config),
    ));
    let gate = StalenessGate::new(store, config.freshness_window());

    let mut scheduler =
        IngestScheduler::new(Arc::clone(&orchestrator), gate.clone(), config.freshness_window());
    scheduler.start().await?;

    let app = build_app(AppState {
        pool,
        gate,
        stage: orchestrator.subscribe(),
        distance_matrix: Arc::new(MatrixCache::new(config.distance_matrix_path.clone())),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "read API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop(config.shutdown_grace()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
