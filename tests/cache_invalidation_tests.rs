// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discovery cache invalidation tests.

use aniversariante_vip::models::FilterState;
use aniversariante_vip::services::{ChangeEvent, ChangeKind};
use axum::{body::Body, http::Request};
use chrono::Utc;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

async fn list(app: axum::Router) -> (String, usize) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/estabelecimentos?city=Florian%C3%B3polis")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cache = response.headers()["x-cache"].to_str().unwrap().to_string();
    let body = common::body_json(response).await;
    (cache, body["establishments"].as_array().unwrap().len())
}

#[tokio::test]
async fn test_repeat_query_served_from_cache() {
    let (app, state) = common::create_test_app();
    common::store(&state)
        .upsert_establishment(&common::establishment("Um", &["Bar"], -27.6, -48.5))
        .unwrap();
    assert!(common::wait_for_generation(&state, 1).await);

    assert_eq!(list(app.clone()).await, ("miss".to_string(), 1));
    assert_eq!(list(app).await, ("hit".to_string(), 1));
}

#[tokio::test]
async fn test_write_invalidates_cached_results() {
    let (app, state) = common::create_test_app();
    let store = common::store(&state);
    let first = common::establishment("Um", &["Bar"], -27.6, -48.5);
    store.upsert_establishment(&first).unwrap();
    assert!(common::wait_for_generation(&state, 1).await);

    assert_eq!(list(app.clone()).await.1, 1);
    assert!(!state.discovery.cache().is_empty());

    store
        .upsert_establishment(&common::establishment("Dois", &["Bar"], -27.6, -48.5))
        .unwrap();
    assert!(common::wait_for_generation(&state, 2).await);
    assert!(state.discovery.cache().is_empty());
    assert_eq!(list(app.clone()).await, ("miss".to_string(), 2));

    store.soft_delete_establishment(first.id, Utc::now()).unwrap();
    assert!(common::wait_for_generation(&state, 3).await);
    assert_eq!(list(app).await.1, 1);
}

#[tokio::test]
async fn test_other_tables_keep_cache() {
    let (app, state) = common::create_test_app();
    common::store(&state)
        .upsert_establishment(&common::establishment("Um", &["Bar"], -27.6, -48.5))
        .unwrap();
    assert!(common::wait_for_generation(&state, 1).await);
    list(app.clone()).await;

    state.bus.publish(ChangeEvent {
        table: "cupons".to_string(),
        kind: ChangeKind::Insert,
        record_id: None,
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(list(app).await.0, "hit");
}

#[tokio::test]
async fn test_fetch_racing_invalidation_is_not_cached() {
    let (_, state) = common::create_test_app();
    let cache = state.discovery.cache();

    let generation = cache.generation();
    cache.invalidate_all();

    let stored =
        cache.insert_if_current("stale".to_string(), generation, Arc::new(Vec::new()));
    assert!(!stored);
    assert!(cache.get("stale").is_none());

    // A normal search after the invalidation is cached again
    let page = state
        .discovery
        .search(&FilterState {
            page: 1,
            per_page: 20,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!page.from_cache);
    assert_eq!(cache.len(), 1);
}
