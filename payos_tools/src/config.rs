use std::time::Duration;

use checkout_common::Secret;
use log::*;

pub const DEFAULT_PAYOS_API_URL: &str = "https://api-merchant.payos.vn";
pub const DEFAULT_PAYOS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct PayOsConfig {
    pub api_url: String,
    pub client_id: String,
    pub api_key: Secret<String>,
    pub checksum_key: Secret<String>,
    pub timeout: Duration,
}

impl Default for PayOsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PAYOS_API_URL.to_string(),
            client_id: String::default(),
            api_key: Secret::default(),
            checksum_key: Secret::default(),
            timeout: DEFAULT_PAYOS_TIMEOUT,
        }
    }
}

impl PayOsConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("PAYOS_API_URL").unwrap_or_else(|_| {
            info!("💳️ PAYOS_API_URL not set, using {DEFAULT_PAYOS_API_URL}");
            DEFAULT_PAYOS_API_URL.to_string()
        });
        let client_id = std::env::var("PAYOS_CLIENT_ID").unwrap_or_else(|_| {
            error!("💳️ PAYOS_CLIENT_ID is not set. Payment links cannot be created without it.");
            String::default()
        });
        let api_key = Secret::new(std::env::var("PAYOS_API_KEY").unwrap_or_else(|_| {
            error!("💳️ PAYOS_API_KEY is not set. Payment links cannot be created without it.");
            String::default()
        }));
        let checksum_key = Secret::new(std::env::var("PAYOS_CHECKSUM_KEY").unwrap_or_else(|_| {
            error!("💳️ PAYOS_CHECKSUM_KEY is not set. Every webhook call will be rejected.");
            String::default()
        }));
        let timeout = std::env::var("PAYOS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("💳️ Invalid value for PAYOS_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PAYOS_TIMEOUT);
        Self { api_url: api_url.trim_end_matches('/').to_string(), client_id, api_key, checksum_key, timeout }
    }
}
