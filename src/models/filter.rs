//! Discovery filter state.

use serde::{Deserialize, Serialize};

/// Raw discovery filters as received in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterState {
    pub city: Option<String>,
    pub state: Option<String>,
    /// Comma-separated category list
    pub category: Option<String>,
    /// Free-text search over establishment names
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;
pub const MAX_RADIUS_KM: f64 = 100.0;

/// Search origin for proximity mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Origin {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

/// Sanitized, validated filters. Its JSON form is the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstablishmentFilter {
    pub city: Option<String>,
    pub state: Option<String>,
    pub categories: Vec<String>,
    pub search: Option<String>,
    pub origin: Option<Origin>,
    pub page: u32,
    pub per_page: u32,
}

impl EstablishmentFilter {
    /// Canonical cache key for this filter.
    pub fn cache_key(&self) -> String {
        // Serializing plain strings, numbers and vectors cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Zero-based row offset of the requested page.
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}
