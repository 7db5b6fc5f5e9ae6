// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Establishment filter builder.
//!
//! Turns query-string filters into a typed [`EstablishmentQuery`] that can be
//! rendered as data API parameters or evaluated directly against rows.

use crate::error::{AppError, Result};
use crate::models::filter::{MAX_PER_PAGE, MAX_RADIUS_KM};
use crate::models::{Establishment, EstablishmentFilter, FilterState, Origin};
use crate::services::distance::EARTH_RADIUS_KM;
use crate::services::sanitize::{
    sanitize_opt, MAX_CATEGORY_LEN, MAX_LOCATION_LEN, MAX_SEARCH_LEN,
};

/// Upper bound on rows fetched for proximity ranking. Only rows inside the
/// origin's bounding box count toward it.
pub const PROXIMITY_FETCH_LIMIT: u32 = 500;

/// Slack added to each side of the bounding box, in degrees (about 10 cm).
const BOX_MARGIN_DEG: f64 = 1e-6;

const MAX_CATEGORIES: usize = 10;

/// Queryable establishment columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    LegalName,
    City,
    State,
    Category,
    Active,
    DeletedAt,
    Latitude,
    Longitude,
}

impl Column {
    /// Column name in the `estabelecimentos` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Name => "nome_fantasia",
            Column::LegalName => "razao_social",
            Column::City => "cidade",
            Column::State => "estado",
            Column::Category => "categoria",
            Column::Active => "ativo",
            Column::DeletedAt => "deleted_at",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
        }
    }

    fn number(&self, row: &Establishment) -> Option<f64> {
        match self {
            Column::Latitude => row.latitude,
            Column::Longitude => row.longitude,
            _ => None,
        }
    }

    fn text<'a>(&self, row: &'a Establishment) -> Option<&'a str> {
        match self {
            Column::Name => Some(row.name.as_str()),
            Column::LegalName => row.legal_name.as_deref(),
            Column::City => row.city.as_deref(),
            Column::State => row.state.as_deref(),
            _ => None,
        }
    }
}

/// How a case-insensitive text match compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// `ILIKE %value%`
    Contains,
    /// `ILIKE value`
    Exact,
}

/// A single row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive text match.
    ILike {
        column: Column,
        value: String,
        mode: MatchMode,
    },
    /// Array column shares at least one element with `values`.
    Overlaps { column: Column, values: Vec<String> },
    /// Boolean column equals `value`.
    IsTrue { column: Column, value: bool },
    /// Column is null.
    IsNull { column: Column },
    /// Column is not null.
    NotNull { column: Column },
    /// Numeric column is at least `value`.
    Gte { column: Column, value: f64 },
    /// Numeric column is at most `value`.
    Lte { column: Column, value: f64 },
    /// At least one inner predicate holds.
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    /// Evaluate against a row.
    pub fn matches(&self, row: &Establishment) -> bool {
        match self {
            Predicate::ILike {
                column,
                value,
                mode,
            } => column.text(row).is_some_and(|text| {
                let text = text.to_lowercase();
                let value = value.to_lowercase();
                match mode {
                    MatchMode::Contains => text.contains(&value),
                    MatchMode::Exact => text == value,
                }
            }),
            Predicate::Overlaps { column, values } => match column {
                Column::Category => row.categories.iter().any(|c| values.contains(c)),
                _ => false,
            },
            Predicate::IsTrue { column, value } => match column {
                Column::Active => row.active == *value,
                _ => false,
            },
            Predicate::IsNull { column } => match column {
                Column::DeletedAt => row.deleted_at.is_none(),
                Column::LegalName => row.legal_name.is_none(),
                Column::City => row.city.is_none(),
                Column::State => row.state.is_none(),
                Column::Latitude => row.latitude.is_none(),
                Column::Longitude => row.longitude.is_none(),
                Column::Name | Column::Category | Column::Active => false,
            },
            Predicate::NotNull { column } => !Predicate::IsNull { column: *column }.matches(row),
            Predicate::Gte { column, value } => column.number(row).is_some_and(|n| n >= *value),
            Predicate::Lte { column, value } => column.number(row).is_some_and(|n| n <= *value),
            Predicate::AnyOf(inner) => inner.iter().any(|p| p.matches(row)),
        }
    }

    /// Render as `(key, value)` in data API filter syntax.
    fn to_param(&self) -> (String, String) {
        match self {
            Predicate::AnyOf(inner) => {
                let parts: Vec<String> = inner.iter().map(|p| p.to_inline()).collect();
                ("or".to_string(), format!("({})", parts.join(",")))
            }
            other => (other.column_name().to_string(), other.operator()),
        }
    }

    /// Render in the `column.op.value` form used inside logical groups.
    fn to_inline(&self) -> String {
        match self {
            Predicate::AnyOf(inner) => {
                let parts: Vec<String> = inner.iter().map(|p| p.to_inline()).collect();
                format!("or({})", parts.join(","))
            }
            other => format!("{}.{}", other.column_name(), other.operator()),
        }
    }

    fn column_name(&self) -> &'static str {
        match self {
            Predicate::ILike { column, .. }
            | Predicate::Overlaps { column, .. }
            | Predicate::IsTrue { column, .. }
            | Predicate::IsNull { column }
            | Predicate::NotNull { column }
            | Predicate::Gte { column, .. }
            | Predicate::Lte { column, .. } => column.as_str(),
            Predicate::AnyOf(_) => "or",
        }
    }

    fn operator(&self) -> String {
        match self {
            Predicate::ILike { value, mode, .. } => match mode {
                MatchMode::Contains => format!("ilike.{}", quote(&format!("*{}*", value))),
                MatchMode::Exact => format!("ilike.{}", quote(value)),
            },
            Predicate::Overlaps { values, .. } => {
                let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
                format!("ov.{{{}}}", items.join(","))
            }
            Predicate::IsTrue { value, .. } => format!("eq.{}", value),
            Predicate::IsNull { .. } => "is.null".to_string(),
            Predicate::NotNull { .. } => "not.is.null".to_string(),
            Predicate::Gte { value, .. } => format!("gte.{}", value),
            Predicate::Lte { value, .. } => format!("lte.{}", value),
            Predicate::AnyOf(_) => String::new(),
        }
    }
}

/// Quote a value when it contains characters reserved by the filter syntax.
/// Sanitized values never contain double quotes or backslashes.
fn quote(value: &str) -> String {
    if value.contains([',', '.', ':', '(', ')', '{', '}', ' ']) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

/// Drop the wildcard characters `ilike` would interpret (`%`, `_` and the
/// `*` alias), leaving a literal pattern. `None` if nothing is left.
fn like_literal(value: &str) -> Option<String> {
    let literal: String = value
        .chars()
        .filter(|c| !matches!(c, '%' | '_' | '*'))
        .collect();
    let literal = literal.trim();
    (!literal.is_empty()).then(|| literal.to_string())
}

/// Coordinate predicates keeping only rows inside the box that encloses the
/// origin's radius. Longitude bounds are skipped when the box would wrap the
/// antimeridian or reach a pole.
fn bounding_box(origin: &Origin) -> Vec<Predicate> {
    let angular = origin.radius_km / EARTH_RADIUS_KM;
    let d_lat = angular.to_degrees() + BOX_MARGIN_DEG;

    let mut predicates = vec![
        Predicate::NotNull {
            column: Column::Latitude,
        },
        Predicate::NotNull {
            column: Column::Longitude,
        },
        Predicate::Gte {
            column: Column::Latitude,
            value: (origin.lat - d_lat).max(-90.0),
        },
        Predicate::Lte {
            column: Column::Latitude,
            value: (origin.lat + d_lat).min(90.0),
        },
    ];

    let ratio = angular.sin() / origin.lat.to_radians().cos();
    if ratio < 1.0 {
        let d_lon = ratio.asin().to_degrees() + BOX_MARGIN_DEG;
        let (west, east) = (origin.lon - d_lon, origin.lon + d_lon);
        if west >= -180.0 && east <= 180.0 {
            predicates.push(Predicate::Gte {
                column: Column::Longitude,
                value: west,
            });
            predicates.push(Predicate::Lte {
                column: Column::Longitude,
                value: east,
            });
        }
    }

    predicates
}

/// A complete establishment query: conjunction of predicates plus paging.
#[derive(Debug, Clone, PartialEq)]
pub struct EstablishmentQuery {
    pub predicates: Vec<Predicate>,
    pub limit: u32,
    pub offset: u32,
}

impl EstablishmentQuery {
    /// Build the query for a sanitized filter.
    ///
    /// In proximity mode paging happens after ranking, so the query fetches
    /// up to [`PROXIMITY_FETCH_LIMIT`] rows from inside the origin's bounding
    /// box, starting at the first.
    pub fn from_filter(filter: &EstablishmentFilter) -> Self {
        let mut predicates = vec![
            Predicate::IsTrue {
                column: Column::Active,
                value: true,
            },
            Predicate::IsNull {
                column: Column::DeletedAt,
            },
        ];

        if let Some(city) = filter.city.as_deref().and_then(like_literal) {
            predicates.push(Predicate::ILike {
                column: Column::City,
                value: city,
                mode: MatchMode::Contains,
            });
        }
        if let Some(state) = filter.state.as_deref().and_then(like_literal) {
            predicates.push(Predicate::ILike {
                column: Column::State,
                value: state,
                mode: MatchMode::Exact,
            });
        }
        if !filter.categories.is_empty() {
            predicates.push(Predicate::Overlaps {
                column: Column::Category,
                values: filter.categories.clone(),
            });
        }
        if let Some(search) = filter.search.as_deref().and_then(like_literal) {
            predicates.push(Predicate::AnyOf(vec![
                Predicate::ILike {
                    column: Column::Name,
                    value: search.clone(),
                    mode: MatchMode::Contains,
                },
                Predicate::ILike {
                    column: Column::LegalName,
                    value: search,
                    mode: MatchMode::Contains,
                },
            ]));
        }

        if let Some(origin) = &filter.origin {
            predicates.extend(bounding_box(origin));
        }

        let (limit, offset) = match filter.origin {
            Some(_) => (PROXIMITY_FETCH_LIMIT, 0),
            None => (filter.per_page, filter.offset()),
        };

        Self {
            predicates,
            limit,
            offset,
        }
    }

    /// Whether a row satisfies every predicate.
    pub fn matches(&self, row: &Establishment) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }

    /// Data API query parameters, including ordering and paging.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.predicates.iter().map(Predicate::to_param));
        params.push(("order".to_string(), "nome_fantasia.asc,id.asc".to_string()));
        params.push(("limit".to_string(), self.limit.to_string()));
        params.push(("offset".to_string(), self.offset.to_string()));
        params
    }
}

/// Sanitize and validate raw query-string filters.
pub fn build_filter(state: &FilterState, default_radius_km: f64) -> Result<EstablishmentFilter> {
    if state.page < 1 {
        return Err(AppError::BadRequest(
            "Page must be greater than 0".to_string(),
        ));
    }

    let categories: Vec<String> = state
        .category
        .as_deref()
        .map(|raw| {
            let mut list: Vec<String> = Vec::new();
            for category in raw
                .split(',')
                .filter_map(|c| sanitize_opt(Some(c), MAX_CATEGORY_LEN))
            {
                if !list.contains(&category) {
                    list.push(category);
                }
            }
            list
        })
        .unwrap_or_default();

    if categories.len() > MAX_CATEGORIES {
        return Err(AppError::BadRequest(format!(
            "At most {} categories may be combined",
            MAX_CATEGORIES
        )));
    }

    let origin = match (state.lat, state.lon) {
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(AppError::BadRequest(
                    "Coordinates out of range".to_string(),
                ));
            }
            let radius_km = state.radius_km.unwrap_or(default_radius_km);
            if !(radius_km > 0.0 && radius_km <= MAX_RADIUS_KM) {
                return Err(AppError::BadRequest(format!(
                    "'radius_km' must be in (0, {}]",
                    MAX_RADIUS_KM
                )));
            }
            Some(Origin {
                lat,
                lon,
                radius_km,
            })
        }
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "'lat' and 'lon' must be given together".to_string(),
            ))
        }
    };

    Ok(EstablishmentFilter {
        city: sanitize_opt(state.city.as_deref(), MAX_LOCATION_LEN),
        state: sanitize_opt(state.state.as_deref(), MAX_LOCATION_LEN),
        categories,
        search: sanitize_opt(state.q.as_deref(), MAX_SEARCH_LEN),
        origin,
        page: state.page,
        per_page: state.per_page.clamp(1, MAX_PER_PAGE),
    })
}
