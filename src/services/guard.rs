// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Protected-route guard.
//!
//! A sequential check chain: live session, then role, then registration
//! completeness. The first failing check decides the redirect.

use crate::db::SupabaseDb;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{BirthdayUser, Role};
use dashmap::DashSet;
use serde::Serialize;
use uuid::Uuid;

/// Why a protected route redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    NoSession,
    WrongRole,
    IncompleteRegistration,
}

impl RedirectReason {
    /// Frontend path to send the user to.
    pub fn target(&self) -> &'static str {
        match self {
            RedirectReason::NoSession | RedirectReason::IncompleteRegistration => "/auth",
            RedirectReason::WrongRole => "/",
        }
    }

    pub fn toast_message(&self) -> &'static str {
        match self {
            RedirectReason::NoSession => "Faça login para continuar.",
            RedirectReason::WrongRole => "Esta área não está disponível para o seu perfil.",
            RedirectReason::IncompleteRegistration => {
                "Complete seu cadastro para acessar esta área."
            }
        }
    }

    /// The registration wizard must resume at step 2.
    pub fn forces_step_two(&self) -> bool {
        matches!(self, RedirectReason::IncompleteRegistration)
    }
}

/// Terminal result of the guard.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    Authorized(AuthUser),
    Redirect(RedirectReason),
}

/// Run the guard chain for a route requiring `required`.
///
/// Lookups only happen once the previous check passed.
pub async fn evaluate(
    db: &SupabaseDb,
    session: Option<&AuthUser>,
    required: Role,
) -> Result<GuardOutcome> {
    let Some(user) = session else {
        return Ok(GuardOutcome::Redirect(RedirectReason::NoSession));
    };

    let role = db.get_role(user.user_id).await?;
    if role != Some(required) {
        tracing::debug!(user_id = %user.user_id, role = ?role, required = ?required, "Guard: role mismatch");
        return Ok(GuardOutcome::Redirect(RedirectReason::WrongRole));
    }

    let complete = match required {
        Role::Aniversariante => db
            .get_birthday_user(user.user_id)
            .await?
            .as_ref()
            .is_some_and(BirthdayUser::is_complete),
        Role::Estabelecimento => db
            .get_establishment_by_owner(user.user_id)
            .await?
            .is_some(),
        Role::Admin => true,
    };

    if !complete {
        tracing::debug!(user_id = %user.user_id, "Guard: registration incomplete");
        return Ok(GuardOutcome::Redirect(
            RedirectReason::IncompleteRegistration,
        ));
    }

    Ok(GuardOutcome::Authorized(user.clone()))
}

/// One-shot latch so each (user, reason) failure toasts only once.
#[derive(Default)]
pub struct ToastLatch {
    fired: DashSet<(Uuid, RedirectReason)>,
}

impl ToastLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a user hits `reason`. Anonymous redirects have
    /// nothing to key on and always toast.
    pub fn should_toast(&self, user_id: Option<Uuid>, reason: RedirectReason) -> bool {
        match user_id {
            Some(id) => self.fired.insert((id, reason)),
            None => true,
        }
    }

    /// Re-arm the latch after the user passes the guard.
    pub fn reset(&self, user_id: Uuid) {
        self.fired.retain(|(id, _)| *id != user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_targets() {
        assert_eq!(RedirectReason::NoSession.target(), "/auth");
        assert_eq!(RedirectReason::WrongRole.target(), "/");
        assert_eq!(RedirectReason::IncompleteRegistration.target(), "/auth");
        assert!(RedirectReason::IncompleteRegistration.forces_step_two());
        assert!(!RedirectReason::WrongRole.forces_step_two());
    }

    #[test]
    fn test_toast_latch_fires_once_per_reason() {
        let latch = ToastLatch::new();
        let user = Uuid::new_v4();

        assert!(latch.should_toast(Some(user), RedirectReason::IncompleteRegistration));
        assert!(!latch.should_toast(Some(user), RedirectReason::IncompleteRegistration));
        assert!(latch.should_toast(Some(user), RedirectReason::WrongRole));

        latch.reset(user);
        assert!(latch.should_toast(Some(user), RedirectReason::IncompleteRegistration));
    }

    #[test]
    fn test_anonymous_always_toasts() {
        let latch = ToastLatch::new();
        assert!(latch.should_toast(None, RedirectReason::NoSession));
        assert!(latch.should_toast(None, RedirectReason::NoSession));
    }

    #[tokio::test]
    async fn test_no_session_skips_lookups() {
        // Offline store fails every call, so reaching it would be an error.
        let db = SupabaseDb::new_mock();
        let outcome = evaluate(&db, None, Role::Aniversariante).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Redirect(RedirectReason::NoSession));
    }
}
