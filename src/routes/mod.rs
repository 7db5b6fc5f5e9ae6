// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod aniversariante;
pub mod auth;
pub mod establishments;
pub mod estabelecimento;
pub mod geo;
pub mod webhook;

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_aniversariante, require_auth, require_estabelecimento};
use crate::models::Role;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Make sure `user_id` acts as `role`, assigning it on first registration.
pub(crate) async fn claim_role(state: &AppState, user_id: Uuid, role: Role) -> Result<()> {
    match state.db.get_role(user_id).await? {
        Some(current) if current == role => Ok(()),
        Some(current) => Err(AppError::Forbidden(format!(
            "User is registered as {}",
            current.as_str()
        ))),
        None => {
            tracing::info!(user_id = %user_id, role = role.as_str(), "Assigning role");
            state.db.set_role(user_id, role).await
        }
    }
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(establishments::routes())
        .merge(geo::routes())
        .merge(auth::routes())
        .merge(webhook::routes());

    // Session required, registration may still be in progress
    let session_routes = aniversariante::registration_routes()
        .merge(estabelecimento::registration_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Full guard: session, role and complete registration
    let birthday_routes = aniversariante::guarded_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), require_aniversariante),
    );
    let establishment_routes = estabelecimento::guarded_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), require_estabelecimento),
    );

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(birthday_routes)
        .merge(establishment_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
