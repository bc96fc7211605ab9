// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

use std::env;
use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hearth_server::api::router;
use hearth_server::auth::JwksManager;
use hearth_server::config::DATA_DIR_ENV;
use hearth_server::ledger::LedgerDb;
use hearth_server::state::{AppState, AuthConfig};
use hearth_server::storage::{DocumentStore, StoragePaths};
use hearth_server::sweeper::PromoSweeper;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn auth_config_from_env() -> AuthConfig {
    let jwks = env::var("AUTH_JWKS_URL").ok().map(JwksManager::new);
    if jwks.is_none() {
        info!("AUTH_JWKS_URL not set; JWT signatures will not be verified (dev builds only)");
    }
    AuthConfig {
        jwks,
        issuer: env::var("AUTH_ISSUER").ok(),
        audience: env::var("AUTH_AUDIENCE").ok(),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Initialize storage
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string());
    let paths = StoragePaths::new(&data_dir);
    let mut storage = DocumentStore::new(paths.clone());
    storage
        .initialize()
        .expect("Failed to initialize storage directory");

    let ledger = LedgerDb::open(&paths.ledger_db()).expect("Failed to open ledger database");

    let pin_pepper = env::var("PIN_PEPPER").unwrap_or_default();
    if pin_pepper.is_empty() {
        info!("PIN_PEPPER not set; withdrawal PINs will be peppered with an empty key");
    }

    let state = AppState::new(storage, ledger)
        .with_auth_config(auth_config_from_env())
        .with_pin_pepper(pin_pepper.into_bytes());

    // Background promotion expiry sweeper
    let shutdown = CancellationToken::new();
    let sweep_interval = env::var("PROMO_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(std::time::Duration::from_secs);
    let mut sweeper = PromoSweeper::new(state.storage());
    if let Some(interval) = sweep_interval {
        sweeper = sweeper.with_interval(interval);
    }
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    info!("Hearth marketplace server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("HTTP server failed");

    // Let the sweeper wind down before exiting
    shutdown.cancel();
    let _ = sweeper_handle.await;
}

/// Resolve on Ctrl-C or SIGTERM and cancel the background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
