//! `EmbedServer`: Axum HTTP server around an [`EmbeddingService`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use redcat_embeddings::EmbeddingService;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::errors::ApiError;
use crate::health::{self, HealthResponse};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Embedding backend.
    pub service: Arc<dyn EmbeddingService>,
    /// When the server started.
    pub start_time: Instant,
}

/// `POST /embed` request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Text to embed.
    pub text: String,
}

/// `POST /embed` response body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// Embedding; empty for empty or whitespace-only text.
    pub vector: Vec<f32>,
    /// `vector.len()`.
    pub dim: usize,
}

/// The embedding HTTP server.
pub struct EmbedServer {
    config: ServerConfig,
    service: Arc<dyn EmbeddingService>,
    start_time: Instant,
}

impl EmbedServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, service: Arc<dyn EmbeddingService>) -> Self {
        Self {
            config,
            service,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/embed", post(embed_handler))
            .route("/health", get(health_handler))
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.config.addr()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(%addr, "embedding server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("embedding server stopped");
        Ok(())
    }
}

/// POST /embed
async fn embed_handler(
    State(state): State<AppState>,
    Json(req): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let vector = state.service.embed(&req.text).await?;
    let dim = vector.len();
    Ok(Json(EmbedResponse { vector, dim }))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.service.is_ready(),
        state.service.dimensions(),
    ))
}
