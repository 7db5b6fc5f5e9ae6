// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding for the "use my location" filter.

use crate::error::Result;
use crate::services::Locality;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/geo/cidade", get(reverse_city))
}

#[derive(Deserialize)]
struct CoordinateParams {
    lat: f64,
    lon: f64,
}

async fn reverse_city(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CoordinateParams>,
) -> Result<Json<Locality>> {
    Ok(Json(state.geocoder.reverse(params.lat, params.lon).await?))
}
