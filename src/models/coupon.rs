// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Coupon model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Days a freshly issued coupon stays valid.
pub const COUPON_VALIDITY_DAYS: i64 = 30;

/// Coupon stored in the `cupons` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Coupon {
    pub id: Uuid,
    /// Code presented at the establishment
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "aniversariante_id")]
    pub user_id: Uuid,
    #[serde(rename = "estabelecimento_id")]
    pub establishment_id: Uuid,
    #[serde(rename = "data_emissao")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "data_validade")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "usado", default)]
    pub used: bool,
}

impl Coupon {
    /// Issue a new coupon valid for [`COUPON_VALIDITY_DAYS`].
    pub fn issue(user_id: Uuid, establishment_id: Uuid, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let code = format!(
            "VIP-{}",
            id.simple().to_string()[..8].to_ascii_uppercase()
        );
        Self {
            id,
            code,
            user_id,
            establishment_id,
            issued_at: now,
            expires_at: now + chrono::Duration::days(COUPON_VALIDITY_DAYS),
            used: false,
        }
    }

    /// Unused and not yet expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}
