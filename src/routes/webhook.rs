// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database change webhook.
//!
//! The hosted database posts a JSON notification for each row change,
//! signed with HMAC-SHA256 over the raw body. Verified events go onto the
//! change bus, which drives discovery cache invalidation.

use crate::services::cache::{ChangeEvent, ChangeKind};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex digest>`.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhooks/db-changes", post(handle_change))
}

/// Row-change notification payload.
#[derive(Deserialize, Debug)]
struct ChangePayload {
    #[serde(rename = "type")]
    kind: ChangeKind,
    table: String,
    #[serde(default)]
    record: Option<serde_json::Value>,
    #[serde(default)]
    old_record: Option<serde_json::Value>,
}

impl ChangePayload {
    /// ID of the changed row (from `record`, or `old_record` for deletes).
    fn record_id(&self) -> Option<String> {
        [&self.record, &self.old_record]
            .into_iter()
            .flatten()
            .find_map(|r| r.get("id"))
            .map(|id| match id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }
}

/// Check a `sha256=<hex>` signature against the body in constant time.
fn verify_signature(secret: &[u8], body: &[u8], header: Option<&str>) -> bool {
    let Some(provided) = header
        .and_then(|h| h.trim().strip_prefix("sha256="))
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(&provided).into()
}

/// Handle a change notification (POST).
async fn handle_change(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    if !verify_signature(&state.config.webhook_secret, &body, signature) {
        tracing::warn!(
            has_signature = signature.is_some(),
            "Security Alert: change webhook signature mismatch"
        );
        return StatusCode::UNAUTHORIZED;
    }

    let payload: ChangePayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed change webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event = ChangeEvent {
        record_id: payload.record_id(),
        table: payload.table,
        kind: payload.kind,
    };
    let receivers = state.bus.publish(event);
    tracing::info!(receivers, "Change webhook accepted");

    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_webhook_secret";

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_signature_roundtrip() {
        let body = br#"{"type":"UPDATE","table":"estabelecimentos"}"#;
        let header = sign(SECRET, body);
        assert!(verify_signature(SECRET, body, Some(&header)));
    }

    #[test]
    fn test_signature_rejections() {
        let body = br#"{"type":"UPDATE","table":"estabelecimentos"}"#;
        let header = sign(SECRET, body);

        assert!(!verify_signature(SECRET, body, None));
        assert!(!verify_signature(b"other", body, Some(&header)));
        assert!(!verify_signature(SECRET, b"{}", Some(&header)));
        assert!(!verify_signature(SECRET, body, Some(&header[7..])));
        assert!(!verify_signature(SECRET, body, Some("sha256=zz")));
    }

    #[test]
    fn test_record_id_prefers_new_row() {
        let payload: ChangePayload = serde_json::from_value(serde_json::json!({
            "type": "DELETE",
            "table": "estabelecimentos",
            "record": null,
            "old_record": { "id": "abc" }
        }))
        .unwrap();
        assert_eq!(payload.kind, ChangeKind::Delete);
        assert_eq!(payload.record_id().as_deref(), Some("abc"));
    }
}
