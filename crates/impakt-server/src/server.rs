//! `ImpaktServer`: Axum HTTP server over a [`Database`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::get;
use impakt_settings::Environment;
use impakt_store::Database;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::health::{self, HealthResponse};
use crate::hello::hello_handler;
use crate::resources;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Connection pool.
    pub db: Database,
    /// When the server started.
    pub start_time: Instant,
    /// Run mode.
    pub environment: Environment,
}

/// The impakt HTTP server.
pub struct ImpaktServer {
    config: ServerConfig,
    db: Database,
    environment: Environment,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl ImpaktServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, db: Database, environment: Environment) -> Self {
        Self {
            config,
            db,
            environment,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            db: self.db.clone(),
            start_time: self.start_time,
            environment: self.environment,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/hello", get(hello_handler))
            .merge(resources::api_router())
            .fallback(fallback_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(self.cors_layer())
    }

    /// Bind the listener and serve until shutdown is requested.
    ///
    /// Returns the bound address and the handle of the serving task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, backend = self.db.backend_name(), environment = %self.environment, "impakt server listening");

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
            info!("impakt server stopped");
        });
        Ok((addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The configured origin only, or any origin when none is configured.
    fn cors_layer(&self) -> CorsLayer {
        let Some(origin) = self.config.cors_origin.as_deref() else {
            return CorsLayer::permissive();
        };
        match HeaderValue::from_str(origin) {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                warn!(origin, "invalid CORS origin, allowing any origin");
                CorsLayer::permissive()
            }
        }
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.environment.as_str(),
        state.db.backend_name(),
    ))
}

/// Unknown routes get the JSON error body too.
async fn fallback_handler() -> ApiError {
    ApiError::not_found("Resource not found")
}
