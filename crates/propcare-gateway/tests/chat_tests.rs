// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! POST /v1/chat and GET /health through the full router.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use propcare_core::{SessionStore, TicketStore};
use propcare_gateway::{ChatResponse, GatewayState, HealthResponse, build_router};
use propcare_test_utils::{TestHarness, turn_json};
use propcare_triage::{TriageSettings, TurnOrchestrator};
use serde_json::{Value, json};
use tower::ServiceExt;

fn router(harness: &TestHarness) -> Router {
    let orchestrator = TurnOrchestrator::new(
        harness.completion.clone(),
        harness.storage.clone(),
        harness.storage.clone(),
        TriageSettings {
            notify_to: Some("ops@example.com".into()),
            ..TriageSettings::default()
        },
    );
    let state = GatewayState::new(Arc::new(orchestrator), harness.storage.clone());
    build_router(state, &["http://localhost:3000".to_string()])
}

async fn post_json(app: &Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/chat")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn first_message_opens_ticket_and_session() {
    let harness = TestHarness::new().await.unwrap();
    let app = router(&harness);

    let (status, body) = post_json(
        &app,
        json!({"message": "My kitchen sink drains slowly", "tenant_name": "Dana Ruiz", "unit": "4B"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let chat: ChatResponse = serde_json::from_value(body).unwrap();
    assert!(chat.ticket_created);
    assert!(!chat.reply.is_empty());
    let ticket_id = chat.ticket_id.unwrap();

    let session = harness
        .storage
        .load_session(&chat.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.ticket_id, Some(ticket_id));
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.identity.unit.as_deref(), Some("4B"));
}

#[tokio::test]
async fn follow_up_reuses_ticket_and_keeps_identity() {
    let harness = TestHarness::new().await.unwrap();
    let app = router(&harness);

    let (_, first) = post_json(
        &app,
        json!({"session_id": "s-42", "message": "Heater is broken", "tenant_name": "Dana Ruiz"}),
    )
    .await;
    let (status, second) = post_json(
        &app,
        json!({"session_id": "s-42", "message": "It started yesterday", "tenant_name": "Someone Else"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["ticket_id"], second["ticket_id"]);
    assert_eq!(second["session_id"], "s-42");

    let session = harness.storage.load_session("s-42").await.unwrap().unwrap();
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.identity.tenant_name.as_deref(), Some("Dana Ruiz"));
    assert_eq!(harness.storage.ticket_count().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_input_is_rejected() {
    let harness = TestHarness::new().await.unwrap();
    let app = router(&harness);

    let (status, body) = post_json(&app, json!({"session_id": "s-1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("message"));
    assert_eq!(harness.completion.call_count().await, 0);
}

#[tokio::test]
async fn completion_failure_returns_generic_error_and_keeps_binding() {
    let harness = TestHarness::new().await.unwrap();
    harness.completion.push_error("upstream unavailable").await;
    let app = router(&harness);

    let (status, body) =
        post_json(&app, json!({"session_id": "s-err", "message": "Toilet keeps running"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "internal_error"}));

    let session = harness.storage.load_session("s-err").await.unwrap().unwrap();
    let ticket_id = session.ticket_id.unwrap();
    assert!(session.messages.is_empty());

    let (status, body) =
        post_json(&app, json!({"session_id": "s-err", "message": "Toilet keeps running"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticket_id"], json!(ticket_id));
    assert_eq!(harness.storage.ticket_count().await.unwrap(), 1);
}

#[tokio::test]
async fn emergency_message_updates_ticket() {
    let harness = TestHarness::builder()
        .with_completions(vec![turn_json(
            "Please leave the unit now. Are you outside?",
            "appliance",
            "P0",
            "action_required",
            true,
            "Gas smell in kitchen",
        )])
        .build()
        .await
        .unwrap();
    let app = router(&harness);

    let (status, body) = post_json(&app, json!({"message": "I smell gas in the kitchen"})).await;
    assert_eq!(status, StatusCode::OK);
    let ticket_id = body["ticket_id"].as_i64().unwrap();
    let ticket = harness.storage.get_ticket(ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.urgency.to_string(), "P0_EMERGENCY");
    assert_eq!(harness.storage.outbox_for_ticket(ticket_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_requests_for_one_session_share_a_ticket() {
    let harness = TestHarness::new().await.unwrap();
    let app = router(&harness);

    let mut handles = Vec::new();
    for i in 0..4 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            post_json(&app, json!({"session_id": "busy", "message": format!("update {i}")})).await
        }));
    }
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(harness.storage.ticket_count().await.unwrap(), 1);
    let session = harness.storage.load_session("busy").await.unwrap().unwrap();
    assert_eq!(session.messages.len(), 8);
}

#[tokio::test]
async fn health_reports_version() {
    let harness = TestHarness::new().await.unwrap();
    let app = router(&harness);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}
