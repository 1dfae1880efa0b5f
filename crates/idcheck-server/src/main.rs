// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idcheck-server — HTTP front end for document registration, face
// verification and email passcodes.
//
// Configuration is read from the JSON file named by `IDCHECK_CONFIG`
// (default `idcheck-data/config.json`); secrets come from the environment,
// optionally via a `.env` file.

mod error;
mod mailer;
mod otp;
mod routes;
mod state;

use std::path::PathBuf;

use anyhow::Context;
use idcheck_core::config::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, Secrets};

fn config_path() -> PathBuf {
    std::env::var_os("IDCHECK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| AppConfig::default().data_dir.join("config.json"))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(err).context("failed to read .env");
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = config_path();
    let config = AppConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    tracing::info!(config = %path.display(), data_dir = %config.data_dir.display(), "configuration loaded");

    let state = AppState::from_config(&config, &Secrets::from_env())
        .context("failed to initialise application state")?;
    state.otp.spawn_purge_task();

    let app = routes::router(state, &config);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        max_upload_mb = config.max_upload_bytes / 1024 / 1024,
        "idcheck-server ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
    tracing::info!("shutting down");
}
