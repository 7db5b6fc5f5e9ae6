// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public establishment discovery routes.

use crate::error::Result;
use crate::models::{Establishment, FilterState, RankedEstablishment};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Marks whether a discovery response came from the cache.
pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/estabelecimentos", get(list_establishments))
        .route("/api/estabelecimentos/{id}", get(get_establishment))
}

/// Discovery response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DiscoveryResponse {
    pub establishments: Vec<RankedEstablishment>,
    pub page: u32,
    pub per_page: u32,
}

/// List establishments matching the filters.
///
/// With `lat`/`lon` the results are the establishments within the radius,
/// nearest first; otherwise they are ordered by name.
async fn list_establishments(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<FilterState>,
) -> Result<([(HeaderName, HeaderValue); 1], Json<DiscoveryResponse>)> {
    let page = state.discovery.search(&filters).await?;

    let cache_status = if page.from_cache { "hit" } else { "miss" };
    Ok((
        [(CACHE_HEADER, HeaderValue::from_static(cache_status))],
        Json(DiscoveryResponse {
            establishments: page.establishments.as_ref().clone(),
            page: page.page,
            per_page: page.per_page,
        }),
    ))
}

/// Get a single listed establishment.
async fn get_establishment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Establishment>> {
    Ok(Json(state.discovery.get(id).await?))
}
