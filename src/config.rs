//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. When `SUPABASE_URL` is
//! unset the server runs against the in-memory backend.

use std::env;
use std::time::Duration;

/// Default search radius for proximity mode.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Public reverse-geocoding endpoint (Nominatim-compatible).
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS and redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Base URL of the hosted data API (None selects the in-memory backend)
    pub supabase_url: Option<String>,
    /// Reverse-geocoding base URL
    pub geocoder_url: String,
    /// Lifetime of cached discovery responses
    pub cache_ttl: Duration,
    /// Coupon emissions allowed per user per minute
    pub coupon_rate_per_minute: u32,
    /// Radius used when proximity mode omits one
    pub default_radius_km: f64,

    // --- Secrets ---
    /// Service-role key for the data API
    pub supabase_service_key: String,
    /// JWT signing secret shared with the auth provider (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC secret for database change webhooks
    pub webhook_secret: Vec<u8>,
}

impl Config {
    /// Config for tests: in-memory backend, short-lived fixed secrets.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            supabase_url: None,
            geocoder_url: "http://127.0.0.1:9".to_string(),
            cache_ttl: Duration::from_secs(300),
            coupon_rate_per_minute: 5,
            default_radius_km: DEFAULT_RADIUS_KM,
            supabase_service_key: "test_service_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            webhook_secret: b"test_webhook_secret".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase_url = env::var("SUPABASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        let supabase_service_key = match &supabase_url {
            Some(_) => env::var("SUPABASE_SERVICE_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_SERVICE_KEY"))?,
            None => String::new(),
        };

        let default_radius_km = parse_or("DEFAULT_RADIUS_KM", DEFAULT_RADIUS_KM)?;
        if !(default_radius_km > 0.0) {
            return Err(ConfigError::Invalid("DEFAULT_RADIUS_KM"));
        }

        let coupon_rate_per_minute: u32 = parse_or("COUPON_RATE_PER_MINUTE", 5)?;
        if coupon_rate_per_minute == 0 {
            return Err(ConfigError::Invalid("COUPON_RATE_PER_MINUTE"));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            supabase_url,
            geocoder_url: env::var("GEOCODER_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string()),
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 300)?),
            coupon_rate_per_minute,
            default_radius_km,

            supabase_service_key,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            webhook_secret: env::var("WEBHOOK_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("WEBHOOK_SECRET"))?
                .into_bytes(),
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("WEBHOOK_SECRET", " whsec ");
        env::remove_var("SUPABASE_URL");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.webhook_secret, b"whsec".to_vec());
        assert!(config.supabase_url.is_none());
        assert_eq!(config.default_radius_km, DEFAULT_RADIUS_KM);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("VIP_TEST_PARSE_OR", "not-a-number");
        let result: Result<u32, _> = parse_or("VIP_TEST_PARSE_OR", 5);
        assert!(matches!(result, Err(ConfigError::Invalid("VIP_TEST_PARSE_OR"))));
    }
}
