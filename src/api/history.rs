//! Conversation history endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;

use super::ApiState;

/// Build the history router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/history", get(get_history).delete(clear_history))
        .with_state(state)
}

/// Paging parameters: `offset` most recent entries are skipped, then up
/// to `limit` entries before that are returned in dialogue order
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

const fn default_limit() -> usize {
    50
}

/// History page response
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponseBody {
    pub success: bool,
    pub history: Vec<HistoryEntry>,
    /// Total entries currently in the ledger
    pub total: usize,
}

/// Get a page of conversation history
async fn get_history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponseBody> {
    let ledger = state.ledger();
    Json(HistoryResponseBody {
        success: true,
        history: ledger.slice(query.limit, query.offset),
        total: ledger.len(),
    })
}

/// Clear-history response
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponseBody {
    pub success: bool,
    pub message: String,
}

/// Clear all conversation history
async fn clear_history(State(state): State<Arc<ApiState>>) -> Json<ClearResponseBody> {
    state.ledger().clear();
    tracing::info!("conversation history cleared");

    Json(ClearResponseBody {
        success: true,
        message: "history cleared".to_string(),
    })
}
