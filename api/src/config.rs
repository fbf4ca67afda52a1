//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use shared::assembler::DEFAULT_SERVICE_NAME;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `LANTERN_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `LANTERN_PORT`: The port to listen on (default: 8080)
/// - `LANTERN_UPSTREAM_URL`: Gateway debug API base URL (default: `http://localhost:50050`)
/// - `LANTERN_EVENTS_URL`: Push endpoint for live events; empty disables the feeds
///   (default: `ws://localhost:50050/ws/logs`)
/// - `LANTERN_SERVICE_NAME`: Service name given to root spans (default: "gateway")
/// - `LANTERN_UPSTREAM_TIMEOUT_MS`: Upstream request timeout (default: 5000)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Base URL of the gateway whose debug entries are read.
    pub upstream_url: String,
    /// Push endpoint for the live feeds, if enabled.
    pub events_url: Option<String>,
    /// Default service name for assembled spans.
    pub service_name: String,
    /// Timeout applied to upstream requests.
    pub upstream_timeout: Duration,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `LANTERN_PORT` is set but cannot be parsed as a valid port number
    /// - `LANTERN_UPSTREAM_TIMEOUT_MS` is set but is not a whole number
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = std::env::var("LANTERN_HOST").unwrap_or(defaults.host);

        let port = std::env::var("LANTERN_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("LANTERN_PORT must be a valid port number")?
            .unwrap_or(defaults.port);

        let upstream_url = std::env::var("LANTERN_UPSTREAM_URL")
            .unwrap_or(defaults.upstream_url)
            .trim_end_matches('/')
            .to_string();

        let events_url = match std::env::var("LANTERN_EVENTS_URL") {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => Some(url),
            Err(_) => defaults.events_url,
        };

        let service_name =
            std::env::var("LANTERN_SERVICE_NAME").unwrap_or(defaults.service_name);

        let upstream_timeout = std::env::var("LANTERN_UPSTREAM_TIMEOUT_MS")
            .ok()
            .map(|ms| ms.parse::<u64>())
            .transpose()
            .context("LANTERN_UPSTREAM_TIMEOUT_MS must be a whole number of milliseconds")?
            .map_or(defaults.upstream_timeout, Duration::from_millis);

        Ok(Self {
            host,
            port,
            upstream_url,
            events_url,
            service_name,
            upstream_timeout,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstream_url: "http://localhost:50050".to_string(),
            events_url: Some("ws://localhost:50050/ws/logs".to_string()),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            upstream_timeout: Duration::from_millis(5000),
        }
    }
}
