//! FormRelay web server.
//!
//! Loads configuration once, refuses to start if anything required is
//! missing, then serves the CSRF token and submit endpoints.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use formrelay::token::spawn_sweeper;
use formrelay::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config_invalid");
            return Err(e).context("Invalid configuration");
        }
    };
    info!(
        port = config.port,
        webhook_host = config.webhook_url.host_str().unwrap_or(""),
        botcheck_provider = ?config.botcheck_provider,
        allowed_origins = ?config.allowed_origins,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        csrf_token_ttl_seconds = config.csrf_token_ttl.as_secs(),
        botcheck_failure_burns_token = config.botcheck_failure_burns_token,
        "config_loaded"
    );

    let port = config.port;
    let sweep_interval = config.csrf_sweep_interval;
    let state = AppState::from_config(config).context("Failed to build application state")?;

    let sweeper = sweep_interval.map(|interval| spawn_sweeper(state.issuer.store().clone(), interval));

    let app = build_router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
