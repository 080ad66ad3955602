use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::attendance::reconciler::ReconcileStrategy;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// Base URL of the remote attendance store, e.g. `http://localhost:8080/api`
    pub api_base_url: String,
    pub api_prefix: String,
    /// Shared HS256 secret of the identity provider. When absent only token expiry is checked.
    pub idp_jwt_secret: Option<String>,
    pub request_timeout_secs: u64,

    pub default_session_type: String,
    pub reconcile_strategy: ReconcileStrategy,

    // Simulated scanner
    pub scanner_member_id: String,
    pub scanner_delay_ms: u64,

    // Rate limiting
    pub rate_read_per_min: u32,
    pub rate_scan_per_min: u32,

    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            idp_jwt_secret: env::var("IDP_JWT_SECRET").ok().filter(|s| !s.is_empty()),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 10)?,

            default_session_type: env::var("DEFAULT_SESSION_TYPE")
                .unwrap_or_else(|_| "Gym Session".to_string()),
            reconcile_strategy: parse_or("RECONCILE_STRATEGY", ReconcileStrategy::Probe)?,

            scanner_member_id: env::var("SCANNER_MEMBER_ID")
                .unwrap_or_else(|_| "MEM001".to_string()),
            scanner_delay_ms: parse_or("SCANNER_DELAY_MS", 2000)?,

            rate_read_per_min: parse_or("RATE_READ_PER_MIN", 1000)?,
            rate_scan_per_min: parse_or("RATE_SCAN_PER_MIN", 120)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            api_prefix: "/api".to_string(),
            idp_jwt_secret: None,
            request_timeout_secs: 5,
            default_session_type: "Gym Session".to_string(),
            reconcile_strategy: ReconcileStrategy::Probe,
            scanner_member_id: "MEM001".to_string(),
            scanner_delay_ms: 0,
            rate_read_per_min: 1000,
            rate_scan_per_min: 1000,
            log_dir: "logs".to_string(),
        }
    }
}
