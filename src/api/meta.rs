//! Health and capability metadata endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::providers::{AudioFormat, SUPPORTED_INPUT_FORMATS, Voice};

use super::ApiState;

/// Health check response
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the health router (no state needed)
pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}

/// A synthesis voice description
#[derive(Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub gender: &'static str,
    pub description: &'static str,
}

/// Static capability metadata
#[derive(Serialize)]
pub struct CapabilitiesResponse {
    pub voices: Vec<VoiceInfo>,
    pub formats: Vec<String>,
    pub input_formats: Vec<String>,
    pub model: String,
}

fn voice_info(voice: Voice) -> VoiceInfo {
    let (gender, description) = match voice {
        Voice::Alloy => ("neutral", "Balanced and versatile"),
        Voice::Echo => ("male", "Deep and resonant"),
        Voice::Fable => ("male", "Warm and engaging"),
        Voice::Onyx => ("male", "Strong and authoritative"),
        Voice::Nova => ("female", "Bright and energetic"),
        Voice::Shimmer => ("female", "Soft and melodic"),
    };

    let id = voice.as_str();
    let mut name = id.to_string();
    name[..1].make_ascii_uppercase();

    VoiceInfo {
        id: id.to_string(),
        name,
        gender,
        description,
    }
}

/// Enumerate supported voices, formats, and the active model
async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        voices: Voice::ALL.into_iter().map(voice_info).collect(),
        formats: AudioFormat::ALL
            .into_iter()
            .map(|f| f.as_str().to_string())
            .collect(),
        input_formats: SUPPORTED_INPUT_FORMATS
            .into_iter()
            .map(str::to_string)
            .collect(),
        model: state.chat_model.clone(),
    })
}

/// Build the capabilities router
pub fn capabilities_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/capabilities", get(capabilities))
        .with_state(state)
}
