// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes used by the frontend router.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::{
    clear_force_step, current_session, redirect_response, FORCE_STEP_COOKIE,
};
use crate::models::Role;
use crate::services::guard::{self, GuardOutcome};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/guard", get(check_guard))
        .route("/api/auth/wizard", get(wizard_step))
}

#[derive(Deserialize)]
pub struct GuardParams {
    role: Role,
}

#[derive(Serialize)]
pub struct GuardAllowed {
    pub authorized: bool,
    pub role: Role,
}

/// Pre-flight check before the frontend renders a protected page.
async fn check_guard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<GuardParams>,
) -> Result<Response> {
    let session = current_session(&state, &jar, &headers);
    let user_id = session.as_ref().map(|s| s.user_id);

    match guard::evaluate(&state.db, session.as_ref(), params.role).await? {
        GuardOutcome::Authorized(user) => {
            state.toast_latch.reset(user.user_id);
            Ok(Json(GuardAllowed {
                authorized: true,
                role: params.role,
            })
            .into_response())
        }
        GuardOutcome::Redirect(reason) => Ok(redirect_response(&state, jar, user_id, reason)),
    }
}

#[derive(Serialize)]
pub struct WizardStep {
    pub step: u8,
}

/// Step the registration wizard should open at.
///
/// The force-step marker is consumed on read.
async fn wizard_step(jar: CookieJar) -> (CookieJar, Json<WizardStep>) {
    let forced = jar
        .get(FORCE_STEP_COOKIE)
        .is_some_and(|c| c.value() == "2");

    if forced {
        (clear_force_step(jar), Json(WizardStep { step: 2 }))
    } else {
        (jar, Json(WizardStep { step: 1 }))
    }
}
