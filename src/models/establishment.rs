// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Partner establishment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// A partner establishment as stored in the `estabelecimentos` table.
///
/// Field names on the wire follow the table's column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Establishment {
    pub id: Uuid,
    /// Owning auth user (None for admin imports)
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    /// Display name
    #[serde(rename = "nome_fantasia")]
    pub name: String,
    /// Registered legal name
    #[serde(rename = "razao_social", default)]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    /// Categories (e.g. "Bar", "Restaurante", "Salão de Beleza")
    #[serde(rename = "categoria", default)]
    pub categories: Vec<String>,
    #[serde(rename = "logradouro", default)]
    pub street: Option<String>,
    #[serde(rename = "numero", default)]
    pub number: Option<String>,
    #[serde(rename = "bairro", default)]
    pub neighborhood: Option<String>,
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    #[serde(rename = "estado", default)]
    pub state: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "ativo", default = "default_active")]
    pub active: bool,
    /// Soft-delete tombstone
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(rename = "descricao_beneficio", default)]
    pub benefit_description: Option<String>,
    #[serde(rename = "galeria_fotos", default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Establishment {
    /// Coordinates as a point (x = longitude, y = latitude), if both are set.
    pub fn location(&self) -> Option<geo::Point<f64>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(geo::Point::new(lon, lat)),
            _ => None,
        }
    }

    /// Visible in discovery: active and not tombstoned.
    pub fn is_listed(&self) -> bool {
        self.active && self.deleted_at.is_none()
    }
}

/// An establishment paired with its distance from the searcher.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankedEstablishment {
    #[serde(flatten)]
    pub establishment: Establishment,
    /// Kilometers from the search origin; None outside proximity mode.
    pub distance_km: Option<f64>,
}
