// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use aniversariante_vip::config::Config;
use aniversariante_vip::db::{MemoryStore, SupabaseDb};
use aniversariante_vip::models::{BirthdayUser, Establishment, Role};
use aniversariante_vip::routes::create_router;
use aniversariante_vip::services::{spawn_invalidator, ChangeBus};
use aniversariante_vip::AppState;
use axum::body::Body;
use axum::http::Response;
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Create a test app backed by empty in-memory tables.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let bus = ChangeBus::new();
    let db = SupabaseDb::new_in_memory(Arc::new(MemoryStore::new(bus.clone())));
    let state = Arc::new(AppState::new(config, db, bus));
    spawn_invalidator(&state.bus, state.discovery.cache().clone());

    (create_router(state.clone()), state)
}

/// Create a test app whose database is offline.
#[allow(dead_code)]
pub fn create_offline_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        SupabaseDb::new_mock(),
        ChangeBus::new(),
    ));
    (create_router(state.clone()), state)
}

/// The in-memory tables behind a test app.
#[allow(dead_code)]
pub fn store(state: &AppState) -> &Arc<MemoryStore> {
    state.db.memory().expect("test app uses in-memory tables")
}

/// Create a valid session token for testing.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: Uuid, signing_key: &[u8]) -> String {
    aniversariante_vip::middleware::auth::create_jwt(user_id, None, signing_key).unwrap()
}

/// An active establishment at the given coordinates.
#[allow(dead_code)]
pub fn establishment(name: &str, categories: &[&str], lat: f64, lon: f64) -> Establishment {
    Establishment {
        id: Uuid::new_v4(),
        owner_id: None,
        name: name.to_string(),
        legal_name: None,
        cnpj: None,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        street: None,
        number: None,
        neighborhood: None,
        city: Some("Florianópolis".to_string()),
        state: Some("SC".to_string()),
        cep: None,
        latitude: Some(lat),
        longitude: Some(lon),
        active: true,
        deleted_at: None,
        benefit_description: Some("Sobremesa grátis".to_string()),
        photo_urls: Vec::new(),
        updated_at: None,
    }
}

/// Register a birthday user with a complete profile.
#[allow(dead_code)]
pub fn seed_complete_birthday_user(state: &AppState) -> Uuid {
    let id = Uuid::new_v4();
    let mut user = BirthdayUser::new(id);
    user.name = Some("Ana Souza".to_string());
    user.cpf = Some("52998224725".to_string());
    user.birth_date = NaiveDate::from_ymd_opt(1990, 5, 17);
    user.phone = Some("48991234567".to_string());
    user.city = Some("Florianópolis".to_string());
    user.state = Some("SC".to_string());
    user.cadastro_completo = true;

    let store = store(state);
    store.set_role(id, Role::Aniversariante);
    store.upsert_birthday_user(&user);
    id
}

/// `x-webhook-signature` value for a body.
#[allow(dead_code)]
pub fn sign_webhook(secret: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Wait until the background invalidator has processed `generation`
/// establishment changes.
#[allow(dead_code)]
pub async fn wait_for_generation(state: &AppState, generation: u64) -> bool {
    for _ in 0..100 {
        if state.discovery.cache().generation() >= generation {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Collect all `Set-Cookie` header values.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
