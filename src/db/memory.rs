// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory tables for local development and tests.
//!
//! Mirrors the constraints the hosted database enforces that this service
//! relies on (one active coupon per user and establishment), and publishes
//! a change event for every write the way database webhooks would.

use crate::db::tables;
use crate::error::{AppError, Result};
use crate::models::{BirthdayUser, Coupon, Establishment, Role};
use crate::services::cache::{ChangeBus, ChangeEvent, ChangeKind};
use crate::services::query::EstablishmentQuery;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory table set.
#[derive(Default)]
pub struct MemoryStore {
    establishments: RwLock<Vec<Establishment>>,
    roles: DashMap<Uuid, Role>,
    users: DashMap<Uuid, BirthdayUser>,
    coupons: RwLock<Vec<Coupon>>,
    bus: Option<ChangeBus>,
}

impl MemoryStore {
    /// Empty store publishing writes on `bus`.
    pub fn new(bus: ChangeBus) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    fn publish(&self, table: &str, kind: ChangeKind, record_id: Uuid) {
        if let Some(bus) = &self.bus {
            bus.publish(ChangeEvent {
                table: table.to_string(),
                kind,
                record_id: Some(record_id.to_string()),
            });
        }
    }

    fn poisoned() -> AppError {
        AppError::Internal(anyhow::anyhow!("in-memory table lock poisoned"))
    }

    // ─── Establishments ──────────────────────────────────────────

    /// Matching rows ordered by name then id, paged like the remote API.
    pub fn query_establishments(&self, query: &EstablishmentQuery) -> Result<Vec<Establishment>> {
        let rows = self.establishments.read().map_err(|_| Self::poisoned())?;
        let mut matched: Vec<Establishment> =
            rows.iter().filter(|r| query.matches(r)).cloned().collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    pub fn get_establishment(&self, id: Uuid) -> Result<Option<Establishment>> {
        let rows = self.establishments.read().map_err(|_| Self::poisoned())?;
        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    pub fn get_establishment_by_owner(&self, owner_id: Uuid) -> Result<Option<Establishment>> {
        let rows = self.establishments.read().map_err(|_| Self::poisoned())?;
        Ok(rows
            .iter()
            .find(|r| r.owner_id == Some(owner_id) && r.deleted_at.is_none())
            .cloned())
    }

    pub fn upsert_establishment(&self, establishment: &Establishment) -> Result<()> {
        let kind = {
            let mut rows = self.establishments.write().map_err(|_| Self::poisoned())?;
            match rows.iter_mut().find(|r| r.id == establishment.id) {
                Some(existing) => {
                    *existing = establishment.clone();
                    ChangeKind::Update
                }
                None => {
                    rows.push(establishment.clone());
                    ChangeKind::Insert
                }
            }
        };
        self.publish(tables::ESTABLISHMENTS, kind, establishment.id);
        Ok(())
    }

    /// Set the tombstone; returns false if no live row had that id.
    pub fn soft_delete_establishment(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let deleted = {
            let mut rows = self.establishments.write().map_err(|_| Self::poisoned())?;
            match rows.iter_mut().find(|r| r.id == id && r.deleted_at.is_none()) {
                Some(row) => {
                    row.deleted_at = Some(now);
                    row.updated_at = Some(now);
                    true
                }
                None => false,
            }
        };
        if deleted {
            self.publish(tables::ESTABLISHMENTS, ChangeKind::Update, id);
        }
        Ok(deleted)
    }

    // ─── Roles & profiles ────────────────────────────────────────

    pub fn get_role(&self, user_id: Uuid) -> Option<Role> {
        self.roles.get(&user_id).map(|r| *r)
    }

    pub fn set_role(&self, user_id: Uuid, role: Role) {
        self.roles.insert(user_id, role);
    }

    pub fn get_birthday_user(&self, user_id: Uuid) -> Option<BirthdayUser> {
        self.users.get(&user_id).map(|u| u.clone())
    }

    pub fn upsert_birthday_user(&self, user: &BirthdayUser) {
        let kind = match self.users.insert(user.id, user.clone()) {
            Some(_) => ChangeKind::Update,
            None => ChangeKind::Insert,
        };
        self.publish(tables::BIRTHDAY_USERS, kind, user.id);
    }

    // ─── Coupons ─────────────────────────────────────────────────

    /// Issue a coupon unless an active one exists for the pair.
    pub fn emit_coupon(
        &self,
        user_id: Uuid,
        establishment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Coupon> {
        let listed = self
            .get_establishment(establishment_id)?
            .is_some_and(|e| e.is_listed());
        if !listed {
            return Err(AppError::NotFound(format!(
                "Establishment {} not found",
                establishment_id
            )));
        }

        let coupon = {
            let mut coupons = self.coupons.write().map_err(|_| Self::poisoned())?;
            let duplicate = coupons.iter().any(|c| {
                c.user_id == user_id && c.establishment_id == establishment_id && c.is_active(now)
            });
            if duplicate {
                return Err(AppError::Conflict(
                    "An active coupon already exists for this establishment".to_string(),
                ));
            }
            let coupon = Coupon::issue(user_id, establishment_id, now);
            coupons.push(coupon.clone());
            coupon
        };

        self.publish(tables::COUPONS, ChangeKind::Insert, coupon.id);
        Ok(coupon)
    }

    /// A user's coupons, newest first.
    pub fn list_coupons(&self, user_id: Uuid) -> Result<Vec<Coupon>> {
        let coupons = self.coupons.read().map_err(|_| Self::poisoned())?;
        let mut mine: Vec<Coupon> = coupons
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(mine)
    }
}
