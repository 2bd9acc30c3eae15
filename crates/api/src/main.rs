//! IntegraHub - integration hub HTTP service
//!
//! Main entry point: loads configuration, builds the application context
//! and serves the HTTP API until Ctrl-C or SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;

use integrahub_api::utils::logging::init_tracing;
use integrahub_api::{router, AppContext};
use integrahub_domain::{HubError, Result};
use integrahub_infra::config;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    init_tracing(config::log_format_is_json());

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) => warn!(error = %e, "no .env file loaded"),
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "integrahub terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = config::load()?;
    let bind_address = config.server.bind_address.clone();

    info!(bind_address = %bind_address, "IntegraHub starting");
    let ctx = Arc::new(AppContext::new(config).await?);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| HubError::Config(format!("cannot bind {bind_address}: {e}")))?;
    info!(bind_address = %bind_address, "HTTP server listening");

    let served = axum::serve(listener, router(Arc::clone(&ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| HubError::Internal(format!("http server failed: {e}")));

    // Workers are stopped even when the server exits with an error.
    let stopped = ctx.shutdown().await;
    served?;
    stopped?;

    info!("IntegraHub stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
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

    info!("graceful shutdown initiated");
}
