// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Establishment discovery pipeline.
//!
//! filters → sanitize → query → (proximity ranking) → page, with responses
//! cached per filter until the establishment table changes.

use crate::db::SupabaseDb;
use crate::error::{AppError, Result};
use crate::models::{Establishment, EstablishmentFilter, FilterState, RankedEstablishment};
use crate::services::cache::ResponseCache;
use crate::services::distance::rank_by_distance;
use crate::services::query::{build_filter, EstablishmentQuery};
use std::sync::Arc;
use uuid::Uuid;

/// One page of discovery results.
#[derive(Debug, Clone)]
pub struct DiscoveryPage {
    pub establishments: Arc<Vec<RankedEstablishment>>,
    pub page: u32,
    pub per_page: u32,
    pub from_cache: bool,
}

/// Discovery service shared by the API routes.
#[derive(Clone)]
pub struct DiscoveryService {
    db: SupabaseDb,
    cache: Arc<ResponseCache>,
    default_radius_km: f64,
}

impl DiscoveryService {
    pub fn new(db: SupabaseDb, cache: Arc<ResponseCache>, default_radius_km: f64) -> Self {
        Self {
            db,
            cache,
            default_radius_km,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Run a discovery search.
    pub async fn search(&self, state: &FilterState) -> Result<DiscoveryPage> {
        let filter = build_filter(state, self.default_radius_km)?;
        let key = filter.cache_key();

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(results = hit.len(), "Discovery cache hit");
            return Ok(DiscoveryPage {
                establishments: hit,
                page: filter.page,
                per_page: filter.per_page,
                from_cache: true,
            });
        }

        let generation = self.cache.generation();
        let results = Arc::new(self.fetch(&filter).await?);
        self.cache.insert_if_current(key, generation, results.clone());

        Ok(DiscoveryPage {
            establishments: results,
            page: filter.page,
            per_page: filter.per_page,
            from_cache: false,
        })
    }

    /// Uncached fetch for a sanitized filter.
    pub async fn fetch(&self, filter: &EstablishmentFilter) -> Result<Vec<RankedEstablishment>> {
        let query = EstablishmentQuery::from_filter(filter);
        let rows = self.db.query_establishments(&query).await?;

        tracing::debug!(
            rows = rows.len(),
            city = ?filter.city,
            state = ?filter.state,
            categories = ?filter.categories,
            proximity = filter.origin.is_some(),
            "Fetched establishments"
        );

        Ok(match &filter.origin {
            Some(origin) => rank_by_distance(rows, origin)
                .into_iter()
                .skip(filter.offset() as usize)
                .take(filter.per_page as usize)
                .collect(),
            None => rows.into_iter().map(unranked).collect(),
        })
    }

    /// A listed establishment by ID.
    pub async fn get(&self, id: Uuid) -> Result<Establishment> {
        self.db
            .get_establishment(id)
            .await?
            .filter(Establishment::is_listed)
            .ok_or_else(|| AppError::NotFound(format!("Establishment {} not found", id)))
    }
}

fn unranked(establishment: Establishment) -> RankedEstablishment {
    RankedEstablishment {
        establishment,
        distance_km: None,
    }
}
