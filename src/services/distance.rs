// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance and proximity ranking.

use crate::models::{Establishment, Origin, RankedEstablishment};
use geo::Point;
use std::cmp::Ordering;

/// Mean Earth radius used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two points given in decimal
/// degrees (x = longitude, y = latitude).
///
/// Non-finite coordinates produce `NaN`.
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let (lat1, lat2) = (a.y().to_radians(), b.y().to_radians());
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Keep establishments with coordinates inside the origin's radius, sorted
/// by ascending distance.
///
/// Equal distances order by name (case-insensitive), then by id.
pub fn rank_by_distance(rows: Vec<Establishment>, origin: &Origin) -> Vec<RankedEstablishment> {
    let center = Point::new(origin.lon, origin.lat);

    let mut ranked: Vec<RankedEstablishment> = rows
        .into_iter()
        .filter_map(|establishment| {
            let location = establishment.location()?;
            let distance = haversine_km(center, location);
            (distance <= origin.radius_km).then_some(RankedEstablishment {
                establishment,
                distance_km: Some(distance),
            })
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(a: &RankedEstablishment, b: &RankedEstablishment) -> Ordering {
    let da = a.distance_km.unwrap_or(f64::INFINITY);
    let db = b.distance_km.unwrap_or(f64::INFINITY);
    da.total_cmp(&db)
        .then_with(|| {
            a.establishment
                .name
                .to_lowercase()
                .cmp(&b.establishment.name.to_lowercase())
        })
        .then_with(|| a.establishment.id.cmp(&b.establishment.id))
}
