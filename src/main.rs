use anyhow::Context;
use tokio::net::TcpListener;

use studio_cms::app::app;
use studio_cms::config::config;
use studio_cms::database::DatabaseManager;
use studio_cms::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DB_*, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();
    studio_cms::init_tracing();

    // Initialize configuration (this loads the config singleton)
    let config = config().clone();
    tracing::info!("Starting Studio CMS API in {:?} mode", config.environment);
    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in {:?} mode", config.environment);
    }
    if config.cache.revalidate_secret.is_empty() {
        tracing::warn!("REVALIDATE_SECRET is not set; /api/revalidate will reject every call");
    }

    // Connections open on first use so the server starts even while MySQL is still booting
    let pool = DatabaseManager::connect_lazy(&config).context("invalid database configuration")?;
    if config.database.run_migrations {
        DatabaseManager::run_migrations(&pool).await.context("failed to run migrations")?;
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Studio CMS API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(pool, config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or (on Unix) SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
