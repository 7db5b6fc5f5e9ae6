// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data API client with typed operations.
//!
//! Provides high-level operations for:
//! - Establishments (discovery queries, profile upserts, soft deletes)
//! - Roles and birthday-user profiles (route guard lookups)
//! - Coupons (issuance through the `emit_coupon_secure` procedure)
//!
//! Talks to a PostgREST-compatible REST API. Without a configured URL the
//! same operations run against [`MemoryStore`].

use crate::db::{tables, MemoryStore, EMIT_COUPON_RPC};
use crate::error::{AppError, Result};
use crate::models::{BirthdayUser, Coupon, Establishment, Role, UserRole};
use crate::services::query::EstablishmentQuery;
use crate::services::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// REST client for the hosted data API.
#[derive(Clone)]
struct RestClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    retry: RetryPolicy,
}

#[derive(Clone)]
enum Backend {
    Remote(RestClient),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Database client.
#[derive(Clone)]
pub struct SupabaseDb {
    backend: Backend,
}

impl SupabaseDb {
    /// Client for the hosted data API at `base_url`.
    pub fn new(base_url: &str, service_key: &str) -> Self {
        tracing::info!(url = base_url, "Using hosted data API");
        Self {
            backend: Backend::Remote(RestClient {
                http: reqwest::Client::new(),
                base_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
                service_key: service_key.to_string(),
                retry: RetryPolicy::default(),
            }),
        }
    }

    /// Client backed by in-memory tables.
    pub fn new_in_memory(store: Arc<MemoryStore>) -> Self {
        tracing::info!("Using in-memory data store");
        Self {
            backend: Backend::Memory(store),
        }
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    /// The in-memory tables, when running without a hosted API.
    pub fn memory(&self) -> Option<&Arc<MemoryStore>> {
        match &self.backend {
            Backend::Memory(store) => Some(store),
            _ => None,
        }
    }

    fn offline() -> AppError {
        AppError::store_transport("Database not connected (offline mode)")
    }

    // ─── Establishment Operations ────────────────────────────────

    /// Rows matching a discovery query.
    pub async fn query_establishments(
        &self,
        query: &EstablishmentQuery,
    ) -> Result<Vec<Establishment>> {
        match &self.backend {
            Backend::Remote(client) => {
                client
                    .select(tables::ESTABLISHMENTS, &query.to_params())
                    .await
            }
            Backend::Memory(store) => store.query_establishments(query),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Get an establishment by ID (including inactive or deleted rows).
    pub async fn get_establishment(&self, id: Uuid) -> Result<Option<Establishment>> {
        match &self.backend {
            Backend::Remote(client) => {
                let rows: Vec<Establishment> = client
                    .select(tables::ESTABLISHMENTS, &eq_params("id", id))
                    .await?;
                Ok(rows.into_iter().next())
            }
            Backend::Memory(store) => store.get_establishment(id),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// The live establishment owned by a user.
    pub async fn get_establishment_by_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<Establishment>> {
        match &self.backend {
            Backend::Remote(client) => {
                let mut params = eq_params("owner_id", owner_id);
                params.push(("deleted_at".to_string(), "is.null".to_string()));
                let rows: Vec<Establishment> =
                    client.select(tables::ESTABLISHMENTS, &params).await?;
                Ok(rows.into_iter().next())
            }
            Backend::Memory(store) => store.get_establishment_by_owner(owner_id),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Create or update an establishment.
    pub async fn upsert_establishment(&self, establishment: &Establishment) -> Result<()> {
        match &self.backend {
            Backend::Remote(client) => client.upsert(tables::ESTABLISHMENTS, establishment).await,
            Backend::Memory(store) => store.upsert_establishment(establishment),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Soft-delete an establishment. Returns false if it was already gone.
    pub async fn soft_delete_establishment(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        match &self.backend {
            Backend::Remote(client) => {
                let mut params = eq_params("id", id);
                params.push(("deleted_at".to_string(), "is.null".to_string()));
                let body = serde_json::json!({ "deleted_at": now, "updated_at": now });
                let updated: Vec<Establishment> = client
                    .send(
                        Method::PATCH,
                        tables::ESTABLISHMENTS,
                        &params,
                        &body,
                        "return=representation",
                    )
                    .await?
                    .json()
                    .await
                    .map_err(AppError::store_transport)?;
                Ok(!updated.is_empty())
            }
            Backend::Memory(store) => store.soft_delete_establishment(id, now),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Role & Profile Operations ───────────────────────────────

    /// Role of an auth user, if assigned.
    pub async fn get_role(&self, user_id: Uuid) -> Result<Option<Role>> {
        match &self.backend {
            Backend::Remote(client) => {
                let rows: Vec<UserRole> = client
                    .select(tables::USER_ROLES, &eq_params("user_id", user_id))
                    .await?;
                Ok(rows.into_iter().next().map(|r| r.role))
            }
            Backend::Memory(store) => Ok(store.get_role(user_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Assign a role to an auth user.
    pub async fn set_role(&self, user_id: Uuid, role: Role) -> Result<()> {
        match &self.backend {
            Backend::Remote(client) => {
                client
                    .upsert(tables::USER_ROLES, &UserRole { user_id, role })
                    .await
            }
            Backend::Memory(store) => {
                store.set_role(user_id, role);
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Birthday-user profile by auth user ID.
    pub async fn get_birthday_user(&self, user_id: Uuid) -> Result<Option<BirthdayUser>> {
        match &self.backend {
            Backend::Remote(client) => {
                let rows: Vec<BirthdayUser> = client
                    .select(tables::BIRTHDAY_USERS, &eq_params("id", user_id))
                    .await?;
                Ok(rows.into_iter().next())
            }
            Backend::Memory(store) => Ok(store.get_birthday_user(user_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Create or update a birthday-user profile.
    pub async fn upsert_birthday_user(&self, user: &BirthdayUser) -> Result<()> {
        match &self.backend {
            Backend::Remote(client) => client.upsert(tables::BIRTHDAY_USERS, user).await,
            Backend::Memory(store) => {
                store.upsert_birthday_user(user);
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Coupon Operations ───────────────────────────────────────

    /// Issue a coupon through the server-side procedure.
    ///
    /// The procedure enforces eligibility and the one-active-coupon rule;
    /// a duplicate surfaces as [`AppError::Conflict`].
    pub async fn emit_coupon(
        &self,
        user_id: Uuid,
        establishment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Coupon> {
        match &self.backend {
            Backend::Remote(client) => {
                let body = serde_json::json!({
                    "p_aniversariante_id": user_id,
                    "p_estabelecimento_id": establishment_id,
                });
                client
                    .send(
                        Method::POST,
                        &format!("rpc/{}", EMIT_COUPON_RPC),
                        &[],
                        &body,
                        "return=representation",
                    )
                    .await?
                    .json()
                    .await
                    .map_err(AppError::store_transport)
            }
            Backend::Memory(store) => store.emit_coupon(user_id, establishment_id, now),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// A user's coupons, newest first.
    pub async fn list_coupons(&self, user_id: Uuid) -> Result<Vec<Coupon>> {
        match &self.backend {
            Backend::Remote(client) => {
                let mut params = eq_params("aniversariante_id", user_id);
                params.push(("order".to_string(), "data_emissao.desc".to_string()));
                client.select(tables::COUPONS, &params).await
            }
            Backend::Memory(store) => store.list_coupons(user_id),
            Backend::Offline => Err(Self::offline()),
        }
    }
}

fn eq_params(column: &str, id: Uuid) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "*".to_string()),
        (column.to_string(), format!("eq.{}", id)),
    ]
}

impl RestClient {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// GET rows from a table, retrying transient failures.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> Result<Vec<T>> {
        self.retry
            .run(table, || async move {
                let response = self
                    .request(Method::GET, table)
                    .query(params)
                    .send()
                    .await
                    .map_err(AppError::store_transport)?;
                let response = check_response(response).await?;
                response.json().await.map_err(AppError::store_transport)
            })
            .await
    }

    /// Insert-or-merge a row keyed by its primary key.
    async fn upsert<B: Serialize>(&self, table: &str, row: &B) -> Result<()> {
        self.send(
            Method::POST,
            table,
            &[],
            row,
            "resolution=merge-duplicates,return=minimal",
        )
        .await?;
        Ok(())
    }

    /// Single-shot write; writes are never retried.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: &B,
        prefer: &str,
    ) -> Result<reqwest::Response> {
        let response = self
            .request(method, path)
            .query(params)
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await
            .map_err(AppError::store_transport)?;
        check_response(response).await
    }
}

/// Check response status and classify failures.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    if status == 429 {
        tracing::warn!("Data API rate limit hit (429)");
    }
    Err(AppError::from_store_response(status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EstablishmentFilter;

    #[tokio::test]
    async fn test_offline_mode_fails_every_call() {
        let db = SupabaseDb::new_mock();
        let query = EstablishmentQuery::from_filter(&EstablishmentFilter {
            page: 1,
            per_page: 20,
            ..Default::default()
        });

        let err = db.query_establishments(&query).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(db.get_role(Uuid::new_v4()).await.is_err());
        assert!(db.memory().is_none());
    }

    #[test]
    fn test_eq_params() {
        let id = Uuid::nil();
        let params = eq_params("id", id);
        assert_eq!(
            params[1],
            (
                "id".to_string(),
                "eq.00000000-0000-0000-0000-000000000000".to_string()
            )
        );
    }
}
