use std::{env, net::IpAddr};

use checkout_common::helpers::parse_boolean_flag;
use log::*;
use payos_tools::PayOsConfig;

const DEFAULT_CHECKOUT_HOST: &str = "127.0.0.1";
const DEFAULT_CHECKOUT_PORT: u16 = 4000;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/checkout_store.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// If supplied, requests against the webhook endpoint will be checked against this list of PayOS IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub webhook_whitelist: Option<Vec<IpAddr>>,
    pub payos: PayOsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CHECKOUT_HOST.to_string(),
            port: DEFAULT_CHECKOUT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook_whitelist: None,
            payos: PayOsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CHECKOUT_HOST").ok().unwrap_or_else(|| DEFAULT_CHECKOUT_HOST.into());
        let port = env::var("CHECKOUT_PORT")
            .map(|s| ("CHECKOUT_PORT", s))
            .or_else(|_| env::var("PORT").map(|s| ("PORT", s)))
            .map(|(name, s)| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for {name}. {e} Using the default, {DEFAULT_CHECKOUT_PORT}, \
                         instead."
                    );
                    DEFAULT_CHECKOUT_PORT
                })
            })
            .unwrap_or(DEFAULT_CHECKOUT_PORT);
        let database_url = env::var("CHECKOUT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ CHECKOUT_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("CHECKOUT_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("CHECKOUT_USE_FORWARDED").ok(), false);
        let webhook_whitelist = env::var("CHECKOUT_WEBHOOK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &webhook_whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't accept \
                     any payment notifications."
                );
            },
            None => {
                info!("🪛️ No webhook IP whitelist is set. Only signature validation will be used.");
            },
            Some(whitelist) => {
                info!("🪛️ Webhook IP whitelist: {whitelist:?}");
            },
        }
        let payos = PayOsConfig::new_from_env_or_default();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, webhook_whitelist, payos }
    }
}

/// Parses a comma-separated list of IP addresses. Invalid entries are skipped. `none`, `false` and `0` disable the
/// whitelist.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ The webhook IP whitelist is disabled. If this is not what you want, set CHECKOUT_WEBHOOK_IP_WHITELIST \
             to a comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in CHECKOUT_WEBHOOK_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}
