// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration tests for birthday users and establishments.

use aniversariante_vip::models::Role;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

mod common;

fn json_request(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn birthday_payload(cpf: &str) -> Value {
    json!({
        "nome": "Ana Souza",
        "cpf": cpf,
        "data_nascimento": "1990-05-17",
        "telefone": "(48) 99123-4567",
        "cep": "88010-000",
        "estado": "sc",
        "cidade": "Florianópolis",
        "bairro": "Centro"
    })
}

fn establishment_payload(cnpj: &str) -> Value {
    json!({
        "nome_fantasia": "Bistrô da Lagoa",
        "cnpj": cnpj,
        "categoria": ["Restaurante", "Bar", "Restaurante"],
        "cidade": "Florianópolis",
        "estado": "SC",
        "latitude": -27.6,
        "longitude": -48.55,
        "descricao_beneficio": "Sobremesa grátis no mês do aniversário"
    })
}

#[tokio::test]
async fn test_repeated_digit_cpf_rejected() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/aniversariante/cadastro",
            &token,
            &birthday_payload("111.111.111-11"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_future_birth_date_rejected() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);

    let mut payload = birthday_payload("529.982.247-25");
    payload["data_nascimento"] = json!("2999-01-01");

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/aniversariante/cadastro",
            &token,
            &payload,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_registration_requires_session() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/aniversariante/cadastro")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(birthday_payload("529.982.247-25").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_completes_and_unlocks_guard() {
    let (app, state) = common::create_test_app();
    let user_id = Uuid::new_v4();
    let token = common::create_test_jwt(user_id, &state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/aniversariante/cadastro",
            &token,
            &birthday_payload("529.982.247-25"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["complete"], true);
    assert_eq!(body["profile"]["cpf"], "52998224725");
    assert_eq!(body["profile"]["telefone"], "48991234567");
    assert_eq!(body["profile"]["estado"], "SC");

    let store = common::store(&state);
    assert_eq!(store.get_role(user_id), Some(Role::Aniversariante));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/aniversariante/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/aniversariante/cupons")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_other_role_cannot_register_as_birthday_user() {
    let (app, state) = common::create_test_app();
    let user_id = Uuid::new_v4();
    common::store(&state).set_role(user_id, Role::Estabelecimento);
    let token = common::create_test_jwt(user_id, &state.config.jwt_signing_key);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/aniversariante/cadastro",
            &token,
            &birthday_payload("529.982.247-25"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_cnpj_rejected() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/estabelecimento/cadastro",
            &token,
            &establishment_payload("11.222.333/0001-00"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_establishment_lifecycle() {
    let (app, state) = common::create_test_app();
    let owner = Uuid::new_v4();
    let token = common::create_test_jwt(owner, &state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/estabelecimento/cadastro",
            &token,
            &establishment_payload("11.222.333/0001-81"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = common::body_json(response).await;
    assert_eq!(created["cnpj"], "11222333000181");
    assert_eq!(created["categoria"], json!(["Restaurante", "Bar"]));
    let id = created["id"].as_str().unwrap().to_string();

    // Re-registering updates the same row
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/estabelecimento/cadastro",
            &token,
            &establishment_payload("11.222.333/0001-81"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["id"], id.as_str());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/estabelecimentos/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request("DELETE", "/api/estabelecimento", &token, &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Gone from discovery and the owner no longer passes the guard
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/estabelecimentos/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request("DELETE", "/api/estabelecimento", &token, &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(response).await;
    assert_eq!(body["reason"], "incomplete_registration");
}
