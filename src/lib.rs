// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Aniversariante VIP: birthday-benefit discovery backend
//!
//! This crate provides the backend API for discovering partner
//! establishments that offer birthday benefits, guarding the registered
//! areas of the site, and issuing benefit coupons.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SupabaseDb;
use services::{
    ChangeBus, CouponService, DiscoveryService, GeocodingService, ResponseCache, ToastLatch,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SupabaseDb,
    pub discovery: DiscoveryService,
    pub geocoder: GeocodingService,
    pub coupons: CouponService,
    pub bus: ChangeBus,
    pub toast_latch: ToastLatch,
}

impl AppState {
    /// Wire services around a database client.
    ///
    /// `bus` must be the one the invalidator task listens on.
    pub fn new(config: Config, db: SupabaseDb, bus: ChangeBus) -> Self {
        let cache = Arc::new(ResponseCache::new(config.cache_ttl));
        let discovery = DiscoveryService::new(db.clone(), cache, config.default_radius_km);
        let geocoder = GeocodingService::new(&config.geocoder_url);
        let coupons = CouponService::new(db.clone(), config.coupon_rate_per_minute);

        Self {
            config,
            db,
            discovery,
            geocoder,
            coupons,
            bus,
            toast_latch: ToastLatch::new(),
        }
    }
}
