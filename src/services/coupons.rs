// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coupon issuance with a per-user rate limit.

use crate::db::SupabaseDb;
use crate::error::{AppError, Result};
use crate::models::Coupon;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// Issues coupons through the store, throttled per user.
#[derive(Clone)]
pub struct CouponService {
    db: SupabaseDb,
    limiter: Arc<DefaultKeyedRateLimiter<Uuid>>,
}

impl CouponService {
    /// `per_minute` emissions per user; zero is treated as one.
    pub fn new(db: SupabaseDb, per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            db,
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// Issue a coupon for `user_id` at `establishment_id`.
    pub async fn emit(&self, user_id: Uuid, establishment_id: Uuid) -> Result<Coupon> {
        if self.limiter.check_key(&user_id).is_err() {
            tracing::warn!(user_id = %user_id, "Coupon emission rate limited");
            return Err(AppError::RateLimited);
        }

        let coupon = self
            .db
            .emit_coupon(user_id, establishment_id, chrono::Utc::now())
            .await?;

        tracing::info!(
            user_id = %user_id,
            establishment_id = %establishment_id,
            coupon_id = %coupon.id,
            "Coupon issued"
        );
        Ok(coupon)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Coupon>> {
        self.db.list_coupons(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limit_precedes_store() {
        // The offline store fails every call; the limiter answers first.
        let service = CouponService::new(SupabaseDb::new_mock(), 1);
        let user = Uuid::new_v4();

        let first = service.emit(user, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(first, AppError::Store { .. }));

        let second = service.emit(user, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(second, AppError::RateLimited));

        // Other users have their own budget.
        let other = service.emit(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(other, AppError::Store { .. }));
    }
}
