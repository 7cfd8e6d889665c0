//! Epinetix application entry point.

use std::time::Duration;

use axum::Router;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epinetix::config::Config;
use epinetix::infrastructure::metrics::init_prometheus_recorder;
use epinetix::presentation::{health, metrics};
use epinetix::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epinetix=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting epinetix...");

    let config = Config::from_env();
    let prometheus_handle =
        init_prometheus_recorder().unwrap_or_else(|e| panic!("failed to install Prometheus recorder: {e}"));
    let shutdown_timeout = config.shutdown_timeout;
    let addr = config.socket_addr();

    let state = AppState::bootstrap(config, prometheus_handle).await;

    let app = Router::new()
        .merge(health::routes())
        .merge(metrics::routes())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await
        .unwrap_or_else(|e| panic!("server error: {e}"));

    tracing::info!("epinetix stopped");
}

/// Waits for either SIGINT (ctrl-c) or SIGTERM. `axum::serve`'s graceful
/// shutdown then waits for in-flight requests to finish on its own; a
/// companion timer forces the process down if that takes longer than
/// `timeout`, so a stuck connection can't wedge shutdown indefinitely.
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!(?timeout, "shutdown signal received, draining in-flight requests");
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        tracing::warn!(?timeout, "graceful shutdown timed out, forcing exit");
        std::process::exit(0);
    });
}
