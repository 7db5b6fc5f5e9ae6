// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cache;
pub mod coupons;
pub mod discovery;
pub mod distance;
pub mod documents;
pub mod geocoding;
pub mod guard;
pub mod query;
pub mod retry;
pub mod sanitize;

pub use cache::{spawn_invalidator, ChangeBus, ChangeEvent, ChangeKind, ResponseCache};
pub use coupons::CouponService;
pub use discovery::{DiscoveryPage, DiscoveryService};
pub use geocoding::{GeocodingService, Locality};
pub use guard::{GuardOutcome, RedirectReason, ToastLatch};
pub use retry::RetryPolicy;
