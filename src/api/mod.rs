//! HTTP API server for the Murmur gateway

pub mod history;
pub mod meta;
pub mod turn;
pub mod websocket;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::history::HistoryLedger;
use crate::turn::{TurnOrchestrator, TurnQueue};
use crate::{Error, Result};

/// Shared state for API handlers
pub struct ApiState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub queue: Arc<TurnQueue>,
    /// Chat model identifier, reported by the capabilities endpoint
    pub chat_model: String,
}

impl ApiState {
    #[must_use]
    pub fn ledger(&self) -> &Arc<HistoryLedger> {
        self.orchestrator.ledger()
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub fn new(
        orchestrator: Arc<TurnOrchestrator>,
        queue: Arc<TurnQueue>,
        chat_model: String,
        port: u16,
    ) -> Self {
        Self {
            state: Arc::new(ApiState {
                orchestrator,
                queue,
                chat_model,
            }),
            port,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        Self::router_with_state(self.state.clone())
    }

    /// Build the router for an existing state (used by tests)
    #[must_use]
    pub fn router_with_state(state: Arc<ApiState>) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let api = turn::router(state.clone())
            .merge(history::router(state.clone()))
            .merge(meta::capabilities_router(state.clone()));

        Router::new()
            .nest("/api", api)
            .nest("/ws", websocket::router(state))
            .merge(meta::health_router())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// Structured API error, mapped from pipeline errors
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    stage: Option<&'static str>,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_input",
            stage: None,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::Transcription(_) => (StatusCode::INTERNAL_SERVER_ERROR, "transcription_failed"),
            Error::Completion(_) => (StatusCode::INTERNAL_SERVER_ERROR, "completion_failed"),
            Error::Synthesis(_) => (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        Self {
            status,
            code,
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            stage: Option<&'static str>,
            message: String,
        }

        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: ErrorBody {
                    code: self.code,
                    stage: self.stage,
                    message: self.message,
                },
            }),
        )
            .into_response()
    }
}
