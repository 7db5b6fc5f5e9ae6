// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aniversariante VIP API Server
//!
//! Serves establishment discovery, the registration route guard and coupon
//! issuance on top of a hosted data API (or in-memory tables for local use).

use aniversariante_vip::{
    config::Config,
    db::{MemoryStore, SupabaseDb},
    services::{spawn_invalidator, ChangeBus},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Aniversariante VIP API");

    let bus = ChangeBus::new();
    let db = match &config.supabase_url {
        Some(url) => SupabaseDb::new(url, &config.supabase_service_key),
        None => {
            tracing::warn!("SUPABASE_URL not set; data lives in memory only");
            SupabaseDb::new_in_memory(Arc::new(MemoryStore::new(bus.clone())))
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db, bus));

    // Drop cached discovery responses whenever establishments change
    let invalidator = spawn_invalidator(&state.bus, state.discovery.cache().clone());
    tracing::info!(
        ttl_secs = config.cache_ttl.as_secs(),
        "Discovery cache invalidator started"
    );

    let app = aniversariante_vip::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    invalidator.abort();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aniversariante_vip=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
