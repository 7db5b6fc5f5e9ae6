// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Establishment owner routes: profile registration and removal.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Establishment, Role};
use crate::routes::claim_role;
use crate::services::documents::{digits_only, validate_cep, validate_cnpj, validate_uf};
use crate::services::sanitize::{
    sanitize_input, sanitize_opt, MAX_CATEGORY_LEN, MAX_LOCATION_LEN,
};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const MAX_NAME_LEN: usize = 120;
const MAX_BENEFIT_LEN: usize = 500;

/// Routes needing only a session.
pub fn registration_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/estabelecimento/cadastro", post(register))
}

/// Routes behind the full establishment guard.
pub fn guarded_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/estabelecimento", delete(remove))
}

/// Establishment registration payload.
#[derive(Debug, Deserialize, Validate)]
pub struct EstablishmentRegistration {
    #[validate(length(min = 2, max = 120))]
    pub nome_fantasia: String,
    #[validate(length(max = 160))]
    pub razao_social: Option<String>,
    #[validate(custom(function = "validate_cnpj"))]
    pub cnpj: String,
    #[validate(length(min = 1, max = 10))]
    pub categoria: Vec<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub cidade: String,
    #[validate(custom(function = "validate_uf"))]
    pub estado: String,
    #[validate(custom(function = "validate_cep"))]
    pub cep: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 500))]
    pub descricao_beneficio: Option<String>,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub galeria_fotos: Vec<String>,
}

/// Create or update the caller's establishment.
async fn register(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<EstablishmentRegistration>,
) -> Result<(StatusCode, Json<Establishment>)> {
    req.validate()?;
    if req.latitude.is_some() != req.longitude.is_some() {
        return Err(AppError::BadRequest(
            "latitude and longitude must be given together".to_string(),
        ));
    }

    let mut categories: Vec<String> = Vec::new();
    for category in &req.categoria {
        let clean = sanitize_input(category, MAX_CATEGORY_LEN);
        if !clean.is_empty() && !categories.contains(&clean) {
            categories.push(clean);
        }
    }
    let name = sanitize_input(&req.nome_fantasia, MAX_NAME_LEN);
    let city = sanitize_input(&req.cidade, MAX_LOCATION_LEN);
    if name.is_empty() || city.is_empty() || categories.is_empty() {
        return Err(AppError::BadRequest(
            "Name, city and at least one category are required".to_string(),
        ));
    }

    claim_role(&state, user.user_id, Role::Estabelecimento).await?;

    let existing = state.db.get_establishment_by_owner(user.user_id).await?;
    let created = existing.is_none();
    let now = Utc::now();

    let establishment = Establishment {
        id: existing.as_ref().map_or_else(Uuid::new_v4, |e| e.id),
        owner_id: Some(user.user_id),
        name,
        legal_name: sanitize_opt(req.razao_social.as_deref(), MAX_NAME_LEN),
        cnpj: Some(digits_only(&req.cnpj)),
        categories,
        street: sanitize_opt(req.logradouro.as_deref(), MAX_LOCATION_LEN),
        number: sanitize_opt(req.numero.as_deref(), 20),
        neighborhood: sanitize_opt(req.bairro.as_deref(), MAX_LOCATION_LEN),
        city: Some(city),
        state: Some(req.estado.trim().to_ascii_uppercase()),
        cep: req.cep.as_deref().map(digits_only),
        latitude: req.latitude,
        longitude: req.longitude,
        active: existing.as_ref().map_or(true, |e| e.active),
        deleted_at: None,
        benefit_description: sanitize_opt(req.descricao_beneficio.as_deref(), MAX_BENEFIT_LEN),
        photo_urls: req.galeria_fotos,
        updated_at: Some(now),
    };

    state.db.upsert_establishment(&establishment).await?;

    tracing::info!(
        user_id = %user.user_id,
        establishment_id = %establishment.id,
        created,
        "Establishment registered"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(establishment)))
}

/// Soft-delete the caller's establishment.
async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    let establishment = state
        .db
        .get_establishment_by_owner(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No establishment for this user".to_string()))?;

    if !state
        .db
        .soft_delete_establishment(establishment.id, Utc::now())
        .await?
    {
        return Err(AppError::NotFound(format!(
            "Establishment {} already removed",
            establishment.id
        )));
    }

    tracing::info!(
        user_id = %user.user_id,
        establishment_id = %establishment.id,
        "Establishment soft-deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
