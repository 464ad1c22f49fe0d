//! Turn endpoints: the unified turn route plus granular
//! transcribe/synthesize routes

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::providers::{AudioFormat, TokenUsage, Voice};
use crate::turn::{TurnInput, TurnOptions, TurnOutcome};

use super::{ApiError, ApiState};

/// Build the turn router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/turn", post(run_turn))
        .route("/transcribe", post(transcribe))
        .route("/synthesize", post(synthesize))
        .with_state(state)
}

/// Request body for the unified turn endpoint
///
/// Exactly one of `message` or `audio_data` must be present.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TurnRequestBody {
    /// Typed message input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Base64-encoded audio input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    /// Container/codec tag of `audio_data`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub options: TurnOptionsBody,
}

/// Wire shape of turn options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnOptionsBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,
}

impl From<TurnOptionsBody> for TurnOptions {
    fn from(body: TurnOptionsBody) -> Self {
        Self {
            max_tokens: body.max_tokens,
            temperature: body.temperature,
            top_p: body.top_p,
            voice: body.voice,
            audio_format: body.audio_format,
        }
    }
}

/// Response envelope for the unified turn endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponseBody {
    pub success: bool,
    pub response: TurnResponsePayload,
    pub timestamp: chrono::DateTime<Utc>,
}

/// The processed-turn payload
#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponsePayload {
    /// "success" or "`no_speech_detected`"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Base64-encoded reply audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,
}

impl TurnResponseBody {
    /// Wrap a turn outcome in the response envelope
    #[must_use]
    pub fn from_outcome(outcome: TurnOutcome) -> Self {
        let payload = match outcome {
            TurnOutcome::NoSpeech => TurnResponsePayload {
                status: "no_speech_detected".to_string(),
                transcript: None,
                message: None,
                audio_data: None,
                format: None,
                usage: None,
                synthesis_error: None,
            },
            TurnOutcome::Reply(reply) => TurnResponsePayload {
                status: "success".to_string(),
                transcript: reply.transcript,
                audio_data: reply.audio.map(|bytes| BASE64.encode(bytes)),
                format: Some(reply.audio_format.as_str().to_string()),
                message: Some(reply.message),
                usage: Some(reply.usage),
                synthesis_error: reply.synthesis_error,
            },
        };

        Self {
            success: true,
            response: payload,
            timestamp: Utc::now(),
        }
    }
}

/// Parse a turn request body into pipeline input
///
/// # Errors
///
/// Returns `ApiError` for a missing/ambiguous input or invalid base64
pub fn parse_input(body: &TurnRequestBody) -> Result<TurnInput, ApiError> {
    match (&body.message, &body.audio_data) {
        (Some(_), Some(_)) => Err(ApiError::bad_request(
            "provide either message or audio_data, not both",
        )),
        (Some(message), None) => Ok(TurnInput::Text(message.clone())),
        (None, Some(audio)) => {
            let data = BASE64
                .decode(audio)
                .map_err(|e| ApiError::bad_request(format!("invalid base64 audio: {e}")))?;
            let format = body.format.clone().unwrap_or_else(|| "webm".to_string());
            Ok(TurnInput::Audio { data, format })
        }
        (None, None) => Err(ApiError::bad_request("message or audio_data is required")),
    }
}

/// Run one turn request/response cycle
async fn run_turn(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<TurnRequestBody>,
) -> Result<Json<TurnResponseBody>, ApiError> {
    let input = parse_input(&body)?;
    let options: TurnOptions = body.options.into();

    let outcome = state.orchestrator.run_turn(input, &options).await?;
    Ok(Json(TurnResponseBody::from_outcome(outcome)))
}

/// Transcription-only request
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeRequestBody {
    /// Base64-encoded audio
    pub audio_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Transcription-only response
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponseBody {
    pub success: bool,
    pub text: String,
}

/// Transcribe audio to text
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<TranscribeRequestBody>,
) -> Result<Json<TranscribeResponseBody>, ApiError> {
    let audio = BASE64
        .decode(&body.audio_data)
        .map_err(|e| ApiError::bad_request(format!("invalid base64 audio: {e}")))?;
    let format = body.format.as_deref().unwrap_or("webm");

    let text = state.orchestrator.transcribe(&audio, format).await?;
    Ok(Json(TranscribeResponseBody {
        success: true,
        text,
    }))
}

/// Synthesis-only request
#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesizeRequestBody {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Synthesize text to speech, returning raw audio bytes
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<SynthesizeRequestBody>,
) -> Result<Response, ApiError> {
    let voice = Voice::from_request(body.voice.as_deref(), state.orchestrator.default_voice());
    let format = AudioFormat::from_request(
        body.format.as_deref(),
        state.orchestrator.default_format(),
    );

    let audio = state.orchestrator.synthesize(&body.text, voice, format).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, format.mime())],
        audio,
    )
        .into_response())
}
