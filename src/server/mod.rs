//! HTTP server.
//!
//! This module provides:
//! - Shared application state
//! - The axum router for the JSON API
//! - Mapping of [`AppError`] onto HTTP status codes

mod handlers;

pub use handlers::*;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, FieldIssue, LlmResult};
use crate::llm::LlmClient;
use crate::planner::Generator;
use crate::specs::SpecService;
use crate::storage::SqliteStorage;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Spec lifecycle operations.
    pub specs: SpecService,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: SqliteStorage) -> LlmResult<Self> {
        let llm = LlmClient::new(&config.llm, config.request.clone())?;
        let generator = Generator::new(llm.clone(), &config.llm);

        info!(
            model = %config.llm.model,
            base_url = %config.llm.base_url,
            credential = config.llm.has_credential(),
            "LLM client configured"
        );

        Ok(Self {
            specs: SpecService::new(storage, generator, llm),
            config,
        })
    }
}

/// Shared application state handle.
pub type SharedState = Arc<AppState>;

/// Build the API router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/generate-spec", post(generate_spec))
        .route("/api/specs", get(list_specs))
        .route("/api/specs/{id}", get(get_spec).delete(delete_spec))
        .route("/api/specs/{id}/board", get(get_board))
        .route("/api/specs/{id}/tasks/reorder", patch(reorder_tasks))
        .route("/api/specs/{id}/tasks/move", post(move_task))
        .route("/api/specs/{id}/export", post(export_spec))
        .route("/api/specs/{id}/generations", get(list_generations))
        .route("/api/tasks/{id}", patch(update_task))
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl+C.
pub async fn run_server(state: SharedState) -> std::io::Result<()> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(addr = %listener.local_addr()?, "Feature planner listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.specs.close().await;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

/// Body text of every 5xx response; the detail goes to the log only.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<FieldIssue>>,
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(err) => ErrorBody {
                error: err.summary,
                issues: Some(err.issues),
            },
            other if status.is_server_error() => {
                error!(error = %other, "Request failed");
                ErrorBody {
                    error: INTERNAL_ERROR_MESSAGE.to_string(),
                    issues: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                issues: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
