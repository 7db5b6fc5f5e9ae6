// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database change webhook tests.

use aniversariante_vip::services::ChangeKind;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

fn webhook(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/db-changes")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-webhook-signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_signed_change_is_published() {
    let (app, state) = common::create_test_app();
    let mut receiver = state.bus.subscribe();

    let body = json!({
        "type": "UPDATE",
        "table": "estabelecimentos",
        "schema": "public",
        "record": { "id": "6f1c2f9e-4d1e-4c55-9d49-2f4b3f5a8e10", "ativo": false },
        "old_record": { "id": "6f1c2f9e-4d1e-4c55-9d49-2f4b3f5a8e10", "ativo": true }
    })
    .to_string();
    let signature = common::sign_webhook(&state.config.webhook_secret, body.as_bytes());

    let response = app.oneshot(webhook(&body, Some(&signature))).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let event = receiver.recv().await.unwrap();
    assert_eq!(event.table, "estabelecimentos");
    assert_eq!(event.kind, ChangeKind::Update);
    assert_eq!(
        event.record_id.as_deref(),
        Some("6f1c2f9e-4d1e-4c55-9d49-2f4b3f5a8e10")
    );

    // The invalidator saw it too
    assert!(common::wait_for_generation(&state, 1).await);
}

#[tokio::test]
async fn test_unsigned_or_tampered_rejected() {
    let (app, state) = common::create_test_app();
    let body = json!({ "type": "DELETE", "table": "estabelecimentos" }).to_string();
    let signature = common::sign_webhook(&state.config.webhook_secret, body.as_bytes());

    let response = app.clone().oneshot(webhook(&body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let tampered = body.replace("DELETE", "INSERT");
    let response = app
        .clone()
        .oneshot(webhook(&tampered, Some(&signature)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong_key = common::sign_webhook(b"not-the-secret", body.as_bytes());
    let response = app.oneshot(webhook(&body, Some(&wrong_key))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(state.discovery.cache().generation(), 0);
}

#[tokio::test]
async fn test_signed_garbage_is_bad_request() {
    let (app, state) = common::create_test_app();
    let body = r#"{"type":"TRUNCATE"}"#;
    let signature = common::sign_webhook(&state.config.webhook_secret, body.as_bytes());

    let response = app.oneshot(webhook(body, Some(&signature))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
