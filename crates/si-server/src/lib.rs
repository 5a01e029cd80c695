//! si-server: HTTP API for recording and reporting sales.
//!
//! - Axum router with sale CRUD and analytics endpoints
//! - Request IDs, request tracing, and permissive CORS
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::future::Future;

use si_core::config::Config;
use si_db::DatabaseUrl;
use tokio::net::TcpListener;

pub use crate::context::AppContext;
pub use crate::router::build_router;

/// Start the sales-insights server.
///
/// Connects to the database selected by the configuration, binds the HTTP
/// listener, and serves until SIGINT or SIGTERM.
pub async fn start(config: Config) -> si_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let url = DatabaseUrl::parse(config.database_url())?;
    let store = si_db::connect(&url, &config.database).await?;
    tracing::info!(backend = store.backend(), database = %url, "Database ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| si_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    let ctx = AppContext::new(store);
    serve(listener, ctx, shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve the router on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, ctx: AppContext, shutdown: F) -> si_core::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(local) = listener.local_addr() {
        tracing::info!("Listening on http://{local}");
    }

    let app = build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| si_core::Error::Internal(format!("Server error: {e}")))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
