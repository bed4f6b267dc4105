// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use tagbridge_core::error::{ApiError, ApiResult};

use crate::handlers;
use crate::state::AppState;

// =============================================================================
// ApiConfig
// =============================================================================

/// Query server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4870
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// Returns the socket address to bind.
    pub fn socket_addr(&self) -> ApiResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ApiError::internal(format!("invalid bind address: {}", e)))
    }
}

// =============================================================================
// ApiServer
// =============================================================================

/// The query server.
pub struct ApiServer {
    state: AppState,
    config: ApiConfig,
}

impl ApiServer {
    /// Creates a new server with the given state.
    pub fn new(state: AppState, config: ApiConfig) -> Self {
        Self { state, config }
    }

    /// Creates the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_millis(self.config.request_timeout_ms),
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .route("/status", get(handlers::status))
            .route("/values", get(handlers::values))
            .route("/influxdb-metrics", get(handlers::influxdb_metrics))
            .route("/pubsub/subscribe", post(handlers::subscribe))
            .route("/pubsub/unsubscribe", post(handlers::unsubscribe))
            .layer(middleware_stack)
            .with_state(self.state.clone())
    }

    /// Runs the server with graceful shutdown.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.config.socket_addr()?;
        let router = self.router();

        info!("Starting query server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ApiError::internal(format!("Server error: {}", e)))?;

        info!("Query server stopped");
        Ok(())
    }
}
