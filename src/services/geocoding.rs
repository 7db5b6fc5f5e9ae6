// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding: coordinates to city and state.
//!
//! Handles:
//! - Nominatim-compatible `/reverse` lookups
//! - Locality and state normalization (state names to UF codes)
//! - Caching by coordinates rounded to ~100 m

use crate::error::{AppError, Result};
use crate::services::cache::TtlMap;
use crate::services::documents::UFS;
use crate::services::retry::RetryPolicy;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const USER_AGENT: &str = concat!("aniversariante-vip/", env!("CARGO_PKG_VERSION"));

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const CACHE_MAX_ENTRIES: usize = 10_000;

/// A resolved locality.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Locality {
    pub city: String,
    /// Two-letter UF code when the state could be mapped
    pub state: Option<String>,
}

/// Reverse-geocoding response (only the fields we use).
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    iso_state: Option<String>,
}

type CacheKey = (i32, i32);

/// Reverse-geocoding client with a shared result cache.
#[derive(Clone)]
pub struct GeocodingService {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    cache: Arc<TtlMap<CacheKey, Locality>>,
}

impl GeocodingService {
    pub fn new(base_url: &str) -> Self {
        Self::with_retry(base_url, RetryPolicy::default())
    }

    pub fn with_retry(base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            cache: Arc::new(TtlMap::new(CACHE_TTL, CACHE_MAX_ENTRIES)),
        }
    }

    /// Resolve coordinates to a locality.
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Locality> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::BadRequest("Coordinates out of range".to_string()));
        }

        let key = cache_key(lat, lon);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let url = format!("{}/reverse", self.base_url);
        let response: ReverseResponse = self
            .retry
            .run("reverse_geocode", || {
                let url = url.clone();
                async move {
                    let response = self
                        .http
                        .get(&url)
                        .header(reqwest::header::USER_AGENT, USER_AGENT)
                        .query(&[
                            ("format", "jsonv2".to_string()),
                            ("lat", lat.to_string()),
                            ("lon", lon.to_string()),
                            ("accept-language", "pt-BR".to_string()),
                        ])
                        .send()
                        .await
                        .map_err(|e| AppError::Geocoding(e.to_string()))?;

                    check_status(response.status())?;

                    response
                        .json()
                        .await
                        .map_err(|e| AppError::Geocoding(format!("JSON parse error: {}", e)))
                }
            })
            .await?;

        let locality = locality_from_address(response.address.unwrap_or_default())
            .ok_or_else(|| AppError::NotFound("No locality at these coordinates".to_string()))?;

        tracing::debug!(city = %locality.city, state = ?locality.state, "Reverse geocoded");
        self.cache.insert(key, locality.clone());
        Ok(locality)
    }
}

/// Timeouts and throttling are transient; other 4xx answers are final.
fn check_status(status: StatusCode) -> Result<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Err(AppError::Geocoding(format!("HTTP {}", status)))
        }
        s if s.is_client_error() => Err(AppError::BadRequest(format!(
            "Geocoder rejected request: HTTP {}",
            status
        ))),
        _ => Err(AppError::Geocoding(format!("HTTP {}", status))),
    }
}

fn cache_key(lat: f64, lon: f64) -> CacheKey {
    ((lat * 1000.0).round() as i32, (lon * 1000.0).round() as i32)
}

fn locality_from_address(address: Address) -> Option<Locality> {
    let city = [
        address.city,
        address.town,
        address.village,
        address.municipality,
    ]
    .into_iter()
    .flatten()
    .map(|c| normalize_whitespace(&c))
    .find(|c| !c.is_empty())?;

    let state = address
        .iso_state
        .as_deref()
        .and_then(uf_from_iso)
        .or_else(|| address.state.as_deref().and_then(uf_from_name));

    Some(Locality { city, state })
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `BR-SC` → `SC`.
fn uf_from_iso(code: &str) -> Option<String> {
    let uf = code.trim().strip_prefix("BR-")?.to_ascii_uppercase();
    UFS.contains(&uf.as_str()).then_some(uf)
}

const STATE_NAMES: [(&str, &str); 27] = [
    ("acre", "AC"),
    ("alagoas", "AL"),
    ("amapa", "AP"),
    ("amazonas", "AM"),
    ("bahia", "BA"),
    ("ceara", "CE"),
    ("distrito federal", "DF"),
    ("espirito santo", "ES"),
    ("goias", "GO"),
    ("maranhao", "MA"),
    ("mato grosso", "MT"),
    ("mato grosso do sul", "MS"),
    ("minas gerais", "MG"),
    ("para", "PA"),
    ("paraiba", "PB"),
    ("parana", "PR"),
    ("pernambuco", "PE"),
    ("piaui", "PI"),
    ("rio de janeiro", "RJ"),
    ("rio grande do norte", "RN"),
    ("rio grande do sul", "RS"),
    ("rondonia", "RO"),
    ("roraima", "RR"),
    ("santa catarina", "SC"),
    ("sao paulo", "SP"),
    ("sergipe", "SE"),
    ("tocantins", "TO"),
];

/// Full state name (any accents or casing) or UF code → UF code.
pub fn uf_from_name(name: &str) -> Option<String> {
    let folded = fold_accents(&normalize_whitespace(name)).to_lowercase();
    if folded.len() == 2 {
        let upper = folded.to_ascii_uppercase();
        return UFS.contains(&upper.as_str()).then_some(upper);
    }
    STATE_NAMES
        .iter()
        .find(|(n, _)| *n == folded)
        .map(|(_, uf)| uf.to_string())
}

/// Strip Portuguese diacritics.
fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}
