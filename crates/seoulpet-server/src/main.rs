mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use seoulpet_client::SeoulOpenApi;
use seoulpet_collector::{BatchCollector, Collector};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, CollectRange},
    middleware::{AuthState, RateLimitState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(seoulpet_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = seoulpet_db::PoolConfig::from_app_config(&config);
    let pool = seoulpet_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = seoulpet_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let api = Arc::new(SeoulOpenApi::from_app_config(&config)?);
    let batch = Arc::new(BatchCollector::with_default_bindings(
        Collector::new(pool.clone()),
        api,
    ));
    let range = CollectRange {
        start: config.collect_start,
        end: config.collect_end,
    };

    let _scheduler = scheduler::build_scheduler(
        Arc::clone(&batch),
        config.collect_cron.as_deref(),
        range,
    )
    .await?;

    let auth = AuthState::from_config(&config)?;
    let rate_limit = RateLimitState::from_config(&config);
    tracing::info!(
        max_requests = config.rate_limit_max_requests,
        window_secs = config.rate_limit_window_secs,
        "rate limit configured"
    );
    let app = build_app(AppState { pool, batch, range }, auth, rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "seoulpet-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
