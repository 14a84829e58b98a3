mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, RunLock},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(adrev_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let apps = Arc::new(adrev_core::load_apps(&config.apps_path)?);
    if apps.is_empty() {
        tracing::warn!(
            path = %config.apps_path.display(),
            "app registry is empty; runs will only load aggregate reports"
        );
    }

    let pool = adrev_db::PoolConfig::from_app_config(&config)
        .connect(&config.database_url)
        .await?;
    let applied = adrev_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }

    let client = Arc::new(adrev_applovin::ReportClient::from_app_config(&config)?);
    let run_lock = RunLock::default();

    let _scheduler = scheduler::build_scheduler(
        pool.clone(),
        Arc::clone(&client),
        Arc::clone(&apps),
        run_lock.clone(),
        Arc::clone(&config),
    )
    .await?;

    let auth = AuthState::from_env(matches!(config.env, adrev_core::Environment::Development))?;
    let app = build_app(
        AppState {
            pool,
            client,
            apps,
            run_lock,
        },
        auth,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
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
