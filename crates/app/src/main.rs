mod problem;
mod router;
mod telemetry;
mod todos;

use std::{net::SocketAddr, sync::Arc};

use tokio::signal;
use tracing::{info, warn};
use todo_backend_core::TodoService;
use todo_backend_storage::Database;
use todo_backend_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", url = %config.database_url, "database ready");

    let service = TodoService::new(Arc::new(database.todos()));
    let state = router::AppState::new(metrics, service);
    let cors = router::cors_layer(&config.cors_origins)?;

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        origins = ?config.cors_origins,
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state, cors))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.pool().close().await;
    info!(stage = "app", "server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(stage = "app", error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(stage = "app", error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(stage = "app", "received Ctrl+C, shutting down"),
        () = terminate => info!(stage = "app", "received SIGTERM, shutting down"),
    }
}
