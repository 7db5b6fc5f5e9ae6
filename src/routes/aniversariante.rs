// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Birthday-user routes: registration, profile and coupons.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{BirthdayUser, Coupon, Role};
use crate::routes::claim_role;
use crate::services::documents::{digits_only, validate_cep, validate_cpf, validate_phone, validate_uf};
use crate::services::sanitize::{sanitize_input, sanitize_opt, MAX_LOCATION_LEN};
use crate::time_utils::{format_utc_rfc3339, is_plausible_birth_date};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

const MAX_NAME_LEN: usize = 120;

/// Routes needing only a session (the wizard itself).
pub fn registration_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/aniversariante/cadastro", post(register))
        .route("/api/aniversariante/me", get(get_me))
}

/// Routes behind the full birthday-user guard.
pub fn guarded_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/aniversariante/cupons",
        get(list_coupons).post(emit_coupon),
    )
}

// ─── Registration ────────────────────────────────────────────

/// Wizard step 2 payload.
#[derive(Debug, Deserialize, Validate)]
pub struct BirthdayRegistration {
    #[validate(length(min = 2, max = 120))]
    pub nome: String,
    #[validate(custom(function = "validate_cpf"))]
    pub cpf: String,
    pub data_nascimento: NaiveDate,
    #[validate(custom(function = "validate_phone"))]
    pub telefone: String,
    #[validate(custom(function = "validate_cep"))]
    pub cep: Option<String>,
    #[validate(custom(function = "validate_uf"))]
    pub estado: String,
    #[validate(length(min = 2, max = 100))]
    pub cidade: String,
    pub bairro: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
}

/// Profile plus completion status.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: BirthdayUser,
    pub complete: bool,
    pub missing_fields: Vec<String>,
}

impl From<BirthdayUser> for ProfileResponse {
    fn from(profile: BirthdayUser) -> Self {
        Self {
            complete: profile.is_complete(),
            missing_fields: profile
                .missing_fields()
                .into_iter()
                .map(str::to_string)
                .collect(),
            profile,
        }
    }
}

/// Save the birthday-user profile and mark registration complete.
async fn register(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BirthdayRegistration>,
) -> Result<Json<ProfileResponse>> {
    req.validate()?;
    if !is_plausible_birth_date(req.data_nascimento, Utc::now().date_naive()) {
        let mut errors = ValidationErrors::new();
        errors.add(
            "data_nascimento",
            ValidationError::new("birth_date").with_message("Data de nascimento inválida".into()),
        );
        return Err(errors.into());
    }

    claim_role(&state, user.user_id, Role::Aniversariante).await?;

    let mut profile = state
        .db
        .get_birthday_user(user.user_id)
        .await?
        .unwrap_or_else(|| BirthdayUser::new(user.user_id));

    let name = sanitize_input(&req.nome, MAX_NAME_LEN);
    let city = sanitize_input(&req.cidade, MAX_LOCATION_LEN);
    if name.is_empty() || city.is_empty() {
        return Err(AppError::BadRequest("Name and city are required".to_string()));
    }

    profile.name = Some(name);
    profile.cpf = Some(digits_only(&req.cpf));
    profile.birth_date = Some(req.data_nascimento);
    profile.phone = Some(digits_only(&req.telefone));
    profile.cep = req.cep.as_deref().map(digits_only);
    profile.state = Some(req.estado.trim().to_ascii_uppercase());
    profile.city = Some(city);
    profile.neighborhood = sanitize_opt(req.bairro.as_deref(), MAX_LOCATION_LEN);
    profile.street = sanitize_opt(req.logradouro.as_deref(), MAX_LOCATION_LEN);
    profile.number = sanitize_opt(req.numero.as_deref(), 20);
    profile.cadastro_completo = profile.missing_fields().is_empty();
    profile.updated_at = Some(Utc::now());

    state.db.upsert_birthday_user(&profile).await?;

    tracing::info!(
        user_id = %user.user_id,
        complete = profile.cadastro_completo,
        "Birthday user registered"
    );

    Ok(Json(profile.into()))
}

/// Current birthday-user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .db
        .get_birthday_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user.user_id)))?;
    Ok(Json(profile.into()))
}

// ─── Coupons ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EmitCouponRequest {
    #[serde(alias = "establishment_id")]
    pub estabelecimento_id: Uuid,
}

/// Coupon as shown to its holder.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CouponResponse {
    pub id: Uuid,
    pub codigo: String,
    pub estabelecimento_id: Uuid,
    pub data_emissao: String,
    pub data_validade: String,
    pub usado: bool,
    pub ativo: bool,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        let ativo = coupon.is_active(Utc::now());
        Self {
            id: coupon.id,
            codigo: coupon.code,
            estabelecimento_id: coupon.establishment_id,
            data_emissao: format_utc_rfc3339(coupon.issued_at),
            data_validade: format_utc_rfc3339(coupon.expires_at),
            usado: coupon.used,
            ativo,
        }
    }
}

async fn emit_coupon(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<EmitCouponRequest>,
) -> Result<(StatusCode, Json<CouponResponse>)> {
    let coupon = state
        .coupons
        .emit(user.user_id, req.estabelecimento_id)
        .await?;
    Ok((StatusCode::CREATED, Json(coupon.into())))
}

async fn list_coupons(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CouponResponse>>> {
    let coupons = state.coupons.list(user.user_id).await?;
    Ok(Json(coupons.into_iter().map(Into::into).collect()))
}
