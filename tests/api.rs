//! API endpoint integration tests over mock backends

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use murmur_gateway::api::{ApiServer, ApiState};
use murmur_gateway::turn::TurnQueue;

mod common;
use common::{MockLlm, MockStt, MockTts, build_orchestrator};

/// Build a test router over mock backends
fn build_test_router() -> axum::Router {
    let (orchestrator, _ledger) = build_orchestrator(
        MockStt::returning("hello there"),
        MockLlm::returning("general reply"),
        MockTts::returning(&[1, 2, 3]),
    );
    let queue = Arc::new(TurnQueue::new(orchestrator.clone()));

    let state = Arc::new(ApiState {
        orchestrator,
        queue,
        chat_model: "test-model".to_string(),
    });

    ApiServer::router_with_state(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(uri: &str, method: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = build_test_router();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn capabilities_enumerate_voices_and_formats() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/capabilities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["voices"].as_array().unwrap().len(), 6);
    assert_eq!(json["voices"][0]["id"], "alloy");
    assert_eq!(json["formats"].as_array().unwrap().len(), 4);
    assert_eq!(json["model"], "test-model");
    assert!(
        json["input_formats"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| *f == "webm")
    );
}

#[tokio::test]
async fn message_turn_returns_reply_with_audio() {
    let app = build_test_router();

    let response = app
        .oneshot(json_request(
            "/api/turn",
            "POST",
            serde_json::json!({ "message": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["response"]["status"], "success");
    assert_eq!(json["response"]["message"], "general reply");
    // [1, 2, 3] base64-encoded
    assert_eq!(json["response"]["audio_data"], "AQID");
    assert_eq!(json["response"]["format"], "mp3");
    assert!(json["response"]["transcript"].is_null());
}

#[tokio::test]
async fn audio_turn_includes_transcript() {
    let app = build_test_router();

    let response = app
        .oneshot(json_request(
            "/api/turn",
            "POST",
            serde_json::json!({ "audio_data": "AQID", "format": "wav" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["response"]["transcript"], "hello there");
    assert_eq!(json["response"]["message"], "general reply");
}

#[tokio::test]
async fn turn_without_input_is_rejected() {
    let app = build_test_router();

    let response = app
        .oneshot(json_request("/api/turn", "POST", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn turn_with_both_inputs_is_rejected() {
    let app = build_test_router();

    let response = app
        .oneshot(json_request(
            "/api/turn",
            "POST",
            serde_json::json!({ "message": "hi", "audio_data": "AQID" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_pages_and_clears() {
    let app = build_test_router();

    // One turn produces a user/assistant pair
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/turn",
            "POST",
            serde_json::json!({ "message": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/history?limit=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["history"][0]["role"], "user");
    assert_eq!(json["history"][1]["role"], "assistant");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/history")
                .method("DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/history")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn synthesize_returns_raw_audio() {
    let app = build_test_router();

    let response = app
        .oneshot(json_request(
            "/api/synthesize",
            "POST",
            serde_json::json!({ "text": "say this", "voice": "nova" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.as_ref(), &[1, 2, 3]);
}

#[tokio::test]
async fn oversize_synthesize_text_is_rejected() {
    let app = build_test_router();

    let text = "a".repeat(4001);
    let response = app
        .oneshot(json_request(
            "/api/synthesize",
            "POST",
            serde_json::json!({ "text": text }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn transcribe_returns_text() {
    let app = build_test_router();

    let response = app
        .oneshot(json_request(
            "/api/transcribe",
            "POST",
            serde_json::json!({ "audio_data": "AQID", "format": "wav" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["text"], "hello there");
}

#[tokio::test]
async fn completion_failure_names_the_stage() {
    let (orchestrator, _) = build_orchestrator(
        MockStt::returning("hello"),
        MockLlm::failing(),
        MockTts::returning(&[1]),
    );
    let queue = Arc::new(TurnQueue::new(orchestrator.clone()));
    let state = Arc::new(ApiState {
        orchestrator,
        queue,
        chat_model: "test-model".to_string(),
    });
    let app = ApiServer::router_with_state(state);

    let response = app
        .oneshot(json_request(
            "/api/turn",
            "POST",
            serde_json::json!({ "message": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["stage"], "complete");
    assert_eq!(json["error"]["code"], "completion_failed");
}
