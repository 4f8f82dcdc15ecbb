//! HTTP API server for geoscope
//!
//! This module provides the lookup API on top of an in-memory snapshot of the
//! range dataset.
//!
//! # Endpoints
//!
//! - `GET /lookup?ip=<addr>[&locale=<code>]` - resolve an address
//! - `GET /health` - liveness check, returns `OK`
//! - anything else - `404 {"status":404,"detail":"Route not found"}`
//!
//! # Snapshot lifecycle
//!
//! The snapshot is built once before the listener binds; a missing or
//! unreadable dataset prevents startup. On Unix, `SIGHUP` rebuilds the
//! snapshot from the configured path and swaps it in. Requests in flight
//! finish on the snapshot they started with, and a failed reload keeps the
//! current one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use geoscope::server::{start_server, ServerConfig};
//!
//! let config = ServerConfig::new()
//!     .with_db_path("~/.geoscope/WhatTimeIsIn-geoip.db")
//!     .with_port(5022);
//! start_server(config).await?;
//! ```

pub mod handler;
pub mod handlers;

pub use handler::{ApiError, ApiResult, ErrorBody};

use crate::config::{GeoscopeConfig, DEFAULT_ADDRESS, DEFAULT_LOCALE, DEFAULT_PORT};
use crate::database::{GeoSnapshot, SnapshotStore};
use anyhow::anyhow;
use axum::{routing::get, Router as AxumRouter};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// =============================================================================
// Server Configuration
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: String,

    /// Port to listen on
    pub port: u16,

    /// Range dataset to serve
    pub db_path: String,

    /// Locale used when a request does not name one
    pub locale: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            db_path: GeoscopeConfig::default().db_path,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl From<&GeoscopeConfig> for ServerConfig {
    fn from(config: &GeoscopeConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            db_path: config.db_path.clone(),
            locale: config.locale.clone(),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the dataset path
    pub fn with_db_path(mut self, db_path: impl Into<String>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Set the default locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Get the full bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Server State
// =============================================================================

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Current dataset snapshot
    pub store: Arc<SnapshotStore>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

// =============================================================================
// Axum Router Creation
// =============================================================================

/// Create the Axum router for the lookup API
pub fn create_axum_router(state: ServerState) -> AxumRouter {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    AxumRouter::new()
        .route("/lookup", get(handlers::lookup_handler))
        .route("/health", get(handlers::health_handler))
        .fallback(handlers::fallback_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Snapshot reload
// =============================================================================

/// Rebuild the snapshot on every `SIGHUP`
#[cfg(unix)]
fn spawn_reload_on_hangup(store: Arc<SnapshotStore>, db_path: String) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())
        .map_err(|e| anyhow!("Failed to install SIGHUP handler: {}", e))?;

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading dataset from {}", db_path);
            let store = store.clone();
            let path = db_path.clone();
            match tokio::task::spawn_blocking(move || store.reload_from_path(&path)).await {
                Ok(Ok(loaded)) => info!(
                    "Reloaded dataset (version {}), loaded at {}",
                    loaded.dataset_version.as_deref().unwrap_or("unknown"),
                    loaded.loaded_at
                ),
                Ok(Err(e)) => warn!("Dataset reload failed, keeping current snapshot: {}", e),
                Err(e) => warn!("Dataset reload task failed: {}", e),
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_store: Arc<SnapshotStore>, _db_path: String) -> anyhow::Result<()> {
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// =============================================================================
// Server Startup
// =============================================================================

/// Load the dataset and serve the lookup API until interrupted
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let db_path = config.db_path.clone();
    let snapshot = tokio::task::spawn_blocking(move || GeoSnapshot::load_from_path(&db_path))
        .await
        .map_err(|e| anyhow!("Snapshot loading task failed: {}", e))??;

    let store = Arc::new(SnapshotStore::new(snapshot));
    spawn_reload_on_hangup(store.clone(), config.db_path.clone())?;

    let state = ServerState {
        store,
        config: Arc::new(config.clone()),
    };
    let app = create_axum_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| anyhow!("Failed to bind {}: {}", bind_address, e))?;
    info!("GeoIP API running on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::geo::fixtures::FixtureBuilder;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.port, 5022);
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::new()
            .with_address("127.0.0.1")
            .with_port(9000)
            .with_locale("de")
            .with_db_path("/srv/geo.db");

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.locale, "de");
        assert_eq!(config.db_path, "/srv/geo.db");
    }

    #[test]
    fn test_server_config_from_geoscope_config() {
        let geoscope = GeoscopeConfig {
            port: 6001,
            locale: "fr".to_string(),
            ..Default::default()
        };
        let config = ServerConfig::from(&geoscope);
        assert_eq!(config.port, 6001);
        assert_eq!(config.locale, "fr");
        assert_eq!(config.db_path, geoscope.db_path);
    }

    #[tokio::test]
    async fn test_start_server_requires_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");
        let config = ServerConfig::new()
            .with_address("127.0.0.1")
            .with_port(0)
            .with_db_path(missing.to_str().unwrap());

        let err = start_server(config).await.err().unwrap();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let fixture = FixtureBuilder::new()
            .country_block("10.0.0.0/8", Some(6252001))
            .build();
        let state = ServerState {
            store: Arc::new(SnapshotStore::new(
                GeoSnapshot::load_from_path(fixture.path()).unwrap(),
            )),
            config: Arc::new(ServerConfig::new()),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_axum_router(state)).await.unwrap();
        });

        for (path, expected) in [
            ("/health", "200 OK"),
            ("/lookup?ip=10.1.2.3", "200 OK"),
            ("/lookup?ip=bogus", "400 Bad Request"),
            ("/nope", "404 Not Found"),
        ] {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            let request = format!(
                "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
                path
            );
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            assert!(
                response.starts_with(&format!("HTTP/1.1 {}", expected)),
                "{} -> {}",
                path,
                response
            );
        }
    }
}
