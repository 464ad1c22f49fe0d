//! WebSocket streaming channel for queued voice turns
//!
//! Audio frames arrive as JSON messages, enter the turn queue (so queued
//! turns never interleave), and the processed-turn event comes back
//! asynchronously on the same socket. Per-item failures surface as error
//! events without closing the connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::turn::{TurnInput, TurnOptions, TurnOutcome, TurnRequest};

use super::turn::TurnOptionsBody;
use super::ApiState;

/// Incoming WebSocket message from a client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsIncoming {
    /// Submit an audio frame for a queued voice turn
    AudioTurn {
        /// Base64-encoded audio
        audio_data: String,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        options: TurnOptionsBody,
    },
    /// Submit a typed chat message (processed directly, not queued)
    Chat {
        content: String,
        #[serde(default)]
        options: TurnOptionsBody,
    },
    /// Ping to keep the connection alive
    Ping,
}

/// Outgoing WebSocket message to a client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    /// Connection established
    Connected { session_id: String },
    /// Turn accepted; `depth` is the queue backlog including this turn
    Queued { depth: usize },
    /// A processed voice turn
    Turn {
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_data: Option<String>,
        format: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        synthesis_error: Option<String>,
    },
    /// The clip contained no recognizable speech
    NoSpeech,
    /// Reply to a typed chat message
    ChatReply { message: String },
    /// Error occurred (per-item; the connection stays open)
    Error {
        code: String,
        message: String,
    },
    /// Pong response
    Pong,
}

impl WsOutgoing {
    fn from_outcome(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::NoSpeech => Self::NoSpeech,
            TurnOutcome::Reply(reply) => Self::Turn {
                transcript: reply.transcript,
                message: reply.message,
                audio_data: reply.audio.map(|bytes| BASE64.encode(bytes)),
                format: reply.audio_format.as_str().to_string(),
                synthesis_error: reply.synthesis_error,
            },
        }
    }

    fn from_error(err: &crate::Error) -> Self {
        Self::Error {
            code: err.stage().unwrap_or("internal_error").to_string(),
            message: err.to_string(),
        }
    }
}

/// Build the WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/audio", get(ws_upgrade))
        .with_state(state)
}

/// Handle the WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let session_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    // All outgoing traffic funnels through one channel so concurrent
    // turn results never interleave mid-frame.
    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(32);

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let _ = tx
        .send(WsOutgoing::Connected {
            session_id: session_id.clone(),
        })
        .await;
    tracing::info!(session_id = %session_id, "WebSocket connected");

    while let Some(Ok(message)) = receiver.next().await {
        let Message::Text(text) = message else {
            continue;
        };

        let incoming: WsIncoming = match serde_json::from_str(&text) {
            Ok(incoming) => incoming,
            Err(e) => {
                let _ = tx
                    .send(WsOutgoing::Error {
                        code: "bad_frame".to_string(),
                        message: e.to_string(),
                    })
                    .await;
                continue;
            }
        };

        match incoming {
            WsIncoming::AudioTurn {
                audio_data,
                format,
                options,
            } => {
                let data = match BASE64.decode(&audio_data) {
                    Ok(data) => data,
                    Err(e) => {
                        let _ = tx
                            .send(WsOutgoing::Error {
                                code: "bad_frame".to_string(),
                                message: format!("invalid base64 audio: {e}"),
                            })
                            .await;
                        continue;
                    }
                };

                let request = TurnRequest {
                    input: TurnInput::Audio {
                        data,
                        format: format.unwrap_or_else(|| "webm".to_string()),
                    },
                    options: options.into(),
                };

                let (respond_to, result) = oneshot::channel();
                let depth = state.queue.enqueue(request, respond_to);
                let _ = tx.send(WsOutgoing::Queued { depth }).await;

                let result_tx = tx.clone();
                tokio::spawn(async move {
                    let event = match result.await {
                        Ok(Ok(outcome)) => WsOutgoing::from_outcome(outcome),
                        Ok(Err(e)) => WsOutgoing::from_error(&e),
                        Err(_) => WsOutgoing::Error {
                            code: "internal_error".to_string(),
                            message: "turn result dropped".to_string(),
                        },
                    };
                    let _ = result_tx.send(event).await;
                });
            }
            WsIncoming::Chat { content, options } => {
                let orchestrator = Arc::clone(&state.orchestrator);
                let result_tx = tx.clone();
                let options: TurnOptions = options.into();
                tokio::spawn(async move {
                    let event = match orchestrator.run_turn(TurnInput::Text(content), &options).await
                    {
                        Ok(TurnOutcome::Reply(reply)) => WsOutgoing::ChatReply {
                            message: reply.message,
                        },
                        Ok(TurnOutcome::NoSpeech) => WsOutgoing::NoSpeech,
                        Err(e) => WsOutgoing::from_error(&e),
                    };
                    let _ = result_tx.send(event).await;
                });
            }
            WsIncoming::Ping => {
                let _ = tx.send(WsOutgoing::Pong).await;
            }
        }
    }

    tracing::info!(session_id = %session_id, "WebSocket disconnected");
    drop(tx);
    let _ = send_task.await;
}
