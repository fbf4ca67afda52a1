//! Lantern API Server
//!
//! This crate provides the HTTP server behind the Lantern gateway console.
//! It reads captured traffic from the gateway, assembles execution traces,
//! explains failures, and serves the live log and inspector feeds.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - Trace and diagnostic endpoints backed by the gateway's debug entries
//! - Live log endpoints backed by a push-fed, flush-batched buffer
//! - A JSON-RPC inspector with optional synthetic traffic
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod routes;
mod state;
pub mod upstream;

pub use config::Config;
pub use routes::ApiError;
pub use state::AppState;

use anyhow::Result;
use axum::Router;
use shared::assembler::TraceAssembler;
use shared::live::{FeedConfig, InspectorFeed, LogFeed, WebSocketSource};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use upstream::HttpEntrySource;

/// Largest accepted request body; control requests are tiny JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Runs the Lantern API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Lantern API server with the provided configuration.
///
/// Spawns the live feeds when a push endpoint is configured and tears them down
/// after the server has shut down.
///
/// # Errors
///
/// Returns an error if:
/// - The configured address is invalid or cannot be bound
/// - The HTTP client cannot be built
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        upstream = %config.upstream_url,
        events = ?config.events_url,
        "Lantern API server starting"
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("lantern/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let entries = HttpEntrySource::new(client, &config.upstream_url, config.upstream_timeout);
    let mut state = AppState::new(
        Arc::new(entries),
        TraceAssembler::new(config.service_name.clone()),
    );

    let feeds = config.events_url.as_ref().map(|url| {
        let source = Arc::new(WebSocketSource::new(url.clone()));
        let logs = LogFeed::spawn(source.clone(), FeedConfig::default());
        let inspector = InspectorFeed::spawn(source, FeedConfig::default());
        (logs, inspector)
    });
    if let Some((logs, inspector)) = &feeds {
        state = state
            .with_log_feed(logs.handle())
            .with_inspector_feed(inspector.handle());
    } else {
        tracing::info!("No events URL configured, live feeds disabled");
    }

    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((logs, inspector)) = feeds {
        tokio::join!(logs.teardown(), inspector.teardown());
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::traces_routes(state.clone()))
        .merge(routes::logs_routes(state.clone()))
        .merge(routes::inspector_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
