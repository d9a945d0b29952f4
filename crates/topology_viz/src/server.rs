//! HTTP server for the topology view.
//!
//! [`TopologyServer`] wires the [`api`](crate::api) router to a Tokio listener
//! with optional CORS and request tracing.
//!
//! # Examples
//!
//! ```rust,ignore
//! use topology_viz::{ServerConfig, TopologyServer, TopologySnapshot};
//!
//! #[tokio::main]
//! async fn main() -> topology_viz::Result<()> {
//!     let snapshot = TopologySnapshot::from_file("place.json")?;
//!     let server = TopologyServer::with_snapshot(ServerConfig::default(), snapshot);
//!
//!     let shutdown = async {
//!         tokio::signal::ctrl_c().await.ok();
//!     };
//!     server.start_with_shutdown(shutdown).await
//! }
//! ```

use crate::api::{create_router, ApiState};
use crate::error::{Error, Result};
use crate::snapshot::TopologySnapshot;
use crate::tree::BuildOptions;

use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Configuration for the topology server.
///
/// ```
/// use topology_viz::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.socket_addr().unwrap().port(), 8880);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, `"127.0.0.1"` by default.
    pub host: String,

    /// Port to listen on, `8880` by default.
    pub port: u16,

    /// Send permissive CORS headers.
    pub enable_cors: bool,

    /// Log every HTTP request through `tower-http`'s trace layer.
    pub enable_tracing: bool,

    /// Limits applied to every tree build.
    pub build: BuildOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8880,
            enable_cors: true,
            enable_tracing: true,
            build: BuildOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Binds all interfaces with CORS and tracing on.
    pub fn development() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ..Self::default()
        }
    }

    /// Localhost only, no CORS, no request tracing.
    pub fn production() -> Self {
        Self {
            enable_cors: false,
            enable_tracing: false,
            ..Self::default()
        }
    }

    /// Parses host and port into a [`SocketAddr`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))
    }
}

/// Serves the topology API and page.
pub struct TopologyServer {
    config: ServerConfig,
    state: ApiState,
}

impl TopologyServer {
    /// Creates a server with no snapshot; one can be `PUT` to `/api/place`.
    pub fn new(config: ServerConfig) -> Self {
        let state = ApiState::with_options(config.build);
        Self { config, state }
    }

    /// Creates a server serving `snapshot`.
    pub fn with_snapshot(config: ServerConfig, snapshot: TopologySnapshot) -> Self {
        let state = ApiState::with_snapshot(snapshot, config.build);
        Self { config, state }
    }

    /// Creates a server over existing shared state.
    pub fn with_state(config: ServerConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    /// The shared state, for replacing snapshots from outside the HTTP API.
    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// Builds the router with the configured middleware.
    pub fn router(&self) -> Router {
        let mut app = create_router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        if self.config.enable_tracing {
            app = app.layer(TraceLayer::new_for_http());
        }

        app
    }

    /// Runs until the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, binding fails, or the
    /// server stops with an error.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Runs until `shutdown_signal` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, binding fails, or the
    /// server stops with an error.
    pub async fn start_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let app = self.router();

        log::info!("Starting topology server on http://{}", addr);
        log::info!("  - Page:      http://{}/", addr);
        log::info!("  - API:       http://{}/api/tree", addr);
        log::info!("  - WebSocket: ws://{}/ws/updates", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| Error::Server(format!("Server error: {}", e)))?;

        log::info!("Server shutdown complete");
        Ok(())
    }
}
