// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication and protected-route guard middleware.

use crate::error::AppError;
use crate::models::Role;
use crate::services::guard::{self, GuardOutcome, RedirectReason};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Session cookie holding the access token.
pub const SESSION_COOKIE: &str = "vip_session";
/// One-shot marker telling the registration wizard to open at step 2.
pub const FORCE_STEP_COOKIE: &str = "vip_force_step";
/// Audience claim on access tokens issued by the auth provider.
pub const JWT_AUDIENCE: &str = "authenticated";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (auth user UUID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Candidate tokens in the order they are tried: session cookie, then
/// Bearer header.
fn extract_tokens(jar: &CookieJar, headers: &HeaderMap) -> Vec<String> {
    let cookie = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);
    cookie.into_iter().chain(bearer).collect()
}

/// First candidate token that decodes. A stale cookie does not hide a valid
/// Bearer header.
fn authenticate(
    jar: &CookieJar,
    headers: &HeaderMap,
    signing_key: &[u8],
) -> Result<AuthUser, AppError> {
    let mut result = Err(AppError::Unauthorized);
    for token in extract_tokens(jar, headers) {
        result = decode_session(&token, signing_key);
        if result.is_ok() {
            break;
        }
    }
    result
}

/// Decode and validate an access token.
pub fn decode_session(token: &str, signing_key: &[u8]) -> Result<AuthUser, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[JWT_AUDIENCE]);

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|_| AppError::InvalidToken)?;
    let user_id = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser {
        user_id,
        email: token_data.claims.email,
    })
}

/// The live session on a request, if any. Invalid or expired tokens count
/// as no session.
pub fn current_session(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Option<AuthUser> {
    match authenticate(jar, headers, &state.config.jwt_signing_key) {
        Ok(user) => Some(user),
        Err(AppError::Unauthorized) => None,
        Err(_) => {
            tracing::debug!("Ignoring invalid session token");
            None
        }
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(&jar, request.headers(), &state.config.jwt_signing_key)?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

// ─── Route Guard ─────────────────────────────────────────────

/// Redirect instruction returned to the frontend.
#[derive(Debug, Serialize, PartialEq)]
pub struct GuardRedirect {
    pub redirect: String,
    pub reason: RedirectReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_step: Option<u8>,
}

/// Build the redirect response for a failed guard check.
pub fn redirect_response(
    state: &AppState,
    jar: CookieJar,
    user_id: Option<Uuid>,
    reason: RedirectReason,
) -> Response {
    let toast = state
        .toast_latch
        .should_toast(user_id, reason)
        .then(|| reason.toast_message().to_string());

    let status = match reason {
        RedirectReason::NoSession => StatusCode::UNAUTHORIZED,
        RedirectReason::WrongRole | RedirectReason::IncompleteRegistration => {
            StatusCode::FORBIDDEN
        }
    };

    let jar = if reason.forces_step_two() {
        jar.add(force_step_cookie())
    } else {
        jar
    };

    let body = GuardRedirect {
        redirect: reason.target().to_string(),
        reason,
        toast,
        force_step: reason.forces_step_two().then_some(2),
    };

    (status, jar, Json(body)).into_response()
}

fn force_step_cookie() -> Cookie<'static> {
    Cookie::build((FORCE_STEP_COOKIE, "2"))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .build()
}

/// Remove the force-step marker.
pub fn clear_force_step(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(FORCE_STEP_COOKIE).path("/"))
}

/// Run the guard for `required`, answering with a redirect on failure.
async fn guard_request(
    state: Arc<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
    required: Role,
) -> Result<Response, AppError> {
    let session = current_session(&state, &jar, request.headers());
    let user_id = session.as_ref().map(|s| s.user_id);

    match guard::evaluate(&state.db, session.as_ref(), required).await? {
        GuardOutcome::Authorized(user) => {
            state.toast_latch.reset(user.user_id);
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        GuardOutcome::Redirect(reason) => {
            tracing::info!(user_id = ?user_id, reason = ?reason, required = ?required, "Guard redirect");
            Ok(redirect_response(&state, jar, user_id, reason))
        }
    }
}

/// Guard for birthday-user areas.
pub async fn require_aniversariante(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard_request(state, jar, request, next, Role::Aniversariante).await
}

/// Guard for establishment areas.
pub async fn require_estabelecimento(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard_request(state, jar, request, next, Role::Estabelecimento).await
}

/// Create a JWT for a user session.
pub fn create_jwt(user_id: Uuid, email: Option<&str>, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 60 * 60, // 1 hour
        aud: JWT_AUDIENCE.to_string(),
        email: email.map(str::to_string),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[test]
    fn test_jwt_roundtrip() {
        let id = Uuid::new_v4();
        let token = create_jwt(id, Some("ana@example.com"), KEY).unwrap();
        let user = decode_session(&token, KEY).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = create_jwt(Uuid::new_v4(), None, KEY).unwrap();
        assert!(matches!(
            decode_session(&token, b"another_key_entirely_32_bytes!!!"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(extract_tokens(&CookieJar::new(), &headers), vec!["abc"]);

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from-cookie"));
        assert_eq!(extract_tokens(&jar, &headers), vec!["from-cookie", "abc"]);
    }

    #[test]
    fn test_stale_cookie_does_not_hide_bearer() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", create_jwt(id, None, KEY).unwrap());
        headers.insert(header::AUTHORIZATION, bearer.parse().unwrap());

        let stale = create_jwt(id, None, b"rotated_out_key_32_bytes_long!!!").unwrap();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, stale));
        assert_eq!(authenticate(&jar, &headers, KEY).unwrap().user_id, id);

        assert!(matches!(
            authenticate(&jar, &HeaderMap::new(), KEY),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            authenticate(&CookieJar::new(), &HeaderMap::new(), KEY),
            Err(AppError::Unauthorized)
        ));
    }
}
