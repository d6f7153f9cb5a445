// SPDX-License-Identifier: Apache-2.0

use crate::upstream::stripe::{DEFAULT_STRIPE_API_BASE, STRIPE_MAX_PAGE_LIMIT};
use crate::upstream::RetryPolicy;
use openstreets_raffle_core::RaffleError;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_STRIPE_SECRET_KEY: &str = "STRIPE_SECRET_KEY";
pub const ENV_RAFFLE_PRICE_ID: &str = "RAFFLE_PRICE_ID";
pub const ENV_RAFFLE_ADMIN_PASSWORD: &str = "RAFFLE_ADMIN_PASSWORD";

pub const DEFAULT_SITE_BASE_URL: &str = "https://openstreetstempe.org";

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub site_base_url: String,
    pub max_body_bytes: usize,
    pub shutdown_drain: Duration,
    pub enable_audit_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            max_body_bytes: 8 * 1024,
            shutdown_drain: Duration::from_millis(2000),
            enable_audit_log: true,
        }
    }
}

/// Raffle settings. The three credentials are optional at boot so the rest of
/// the site can serve while the raffle reports itself misconfigured.
#[derive(Debug, Clone, Serialize)]
pub struct RaffleConfig {
    #[serde(skip_serializing)]
    pub stripe_secret_key: Option<String>,
    pub raffle_price_id: Option<String>,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
    #[serde(skip_serializing)]
    pub session_secret: Option<String>,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
    pub stripe_api_base: String,
    pub stripe_page_limit: u32,
    pub stripe_max_pages: usize,
    #[serde(skip)]
    pub retry: RetryPolicy,
    pub history_dir: PathBuf,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            raffle_price_id: None,
            admin_password: None,
            session_secret: None,
            session_ttl: Duration::from_secs(8 * 3600),
            secure_cookies: true,
            stripe_api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            stripe_page_limit: STRIPE_MAX_PAGE_LIMIT,
            stripe_max_pages: crate::upstream::DEFAULT_MAX_PAGES,
            retry: RetryPolicy::default(),
            history_dir: PathBuf::from("artifacts/raffle-history"),
        }
    }
}

/// Borrowed view of the settings a draw cannot run without.
#[derive(Debug, Clone, Copy)]
pub struct RaffleCredentials<'a> {
    pub stripe_secret_key: &'a str,
    pub raffle_price_id: &'a str,
    pub admin_password: &'a str,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl RaffleConfig {
    #[must_use]
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if present(self.stripe_secret_key.as_ref()).is_none() {
            missing.push(ENV_STRIPE_SECRET_KEY);
        }
        if present(self.raffle_price_id.as_ref()).is_none() {
            missing.push(ENV_RAFFLE_PRICE_ID);
        }
        if present(self.admin_password.as_ref()).is_none() {
            missing.push(ENV_RAFFLE_ADMIN_PASSWORD);
        }
        missing
    }

    pub fn credentials(&self) -> Result<RaffleCredentials<'_>, RaffleError> {
        match (
            present(self.stripe_secret_key.as_ref()),
            present(self.raffle_price_id.as_ref()),
            present(self.admin_password.as_ref()),
        ) {
            (Some(stripe_secret_key), Some(raffle_price_id), Some(admin_password)) => {
                Ok(RaffleCredentials {
                    stripe_secret_key,
                    raffle_price_id,
                    admin_password,
                })
            }
            _ => Err(RaffleError::configuration(format!(
                "missing settings: {}",
                self.missing_settings().join(", ")
            ))),
        }
    }
}

/// Narrows a raw page-limit setting without wrapping; range checks stay in
/// [`validate_startup_config`].
pub fn stripe_page_limit_from_raw(raw: u64) -> Result<u32, String> {
    u32::try_from(raw).map_err(|_| {
        format!("stripe page limit {raw} must be within 1..={STRIPE_MAX_PAGE_LIMIT}")
    })
}

pub fn validate_startup_config(server: &ServerConfig, raffle: &RaffleConfig) -> Result<(), String> {
    if server.max_body_bytes == 0 {
        return Err("max_body_bytes must be > 0".to_string());
    }
    if server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(format!("invalid bind addr {}", server.bind_addr));
    }
    if raffle.session_ttl.is_zero() {
        return Err("session ttl must be > 0".to_string());
    }
    if raffle.retry.max_attempts == 0 {
        return Err("stripe retry attempts must be > 0".to_string());
    }
    if raffle.stripe_page_limit == 0 || raffle.stripe_page_limit > STRIPE_MAX_PAGE_LIMIT {
        return Err(format!(
            "stripe page limit must be within 1..={STRIPE_MAX_PAGE_LIMIT}"
        ));
    }
    if raffle.stripe_max_pages == 0 {
        return Err("stripe max pages must be > 0".to_string());
    }
    if raffle
        .session_secret
        .as_deref()
        .is_some_and(|s| !s.is_empty() && s.len() < 16)
    {
        return Err("session secret must be at least 16 bytes".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_are_named_and_blank_counts_as_missing() {
        let cfg = RaffleConfig {
            stripe_secret_key: Some("sk_test".to_string()),
            raffle_price_id: Some("   ".to_string()),
            ..RaffleConfig::default()
        };
        assert_eq!(
            cfg.missing_settings(),
            vec![ENV_RAFFLE_PRICE_ID, ENV_RAFFLE_ADMIN_PASSWORD]
        );
        let err = cfg.credentials().expect_err("incomplete");
        assert!(err.message().contains(ENV_RAFFLE_PRICE_ID));
    }

    #[test]
    fn complete_settings_yield_credentials() {
        let cfg = RaffleConfig {
            stripe_secret_key: Some("sk_test".to_string()),
            raffle_price_id: Some("price_123".to_string()),
            admin_password: Some("hunter2".to_string()),
            ..RaffleConfig::default()
        };
        let creds = cfg.credentials().expect("credentials");
        assert_eq!(creds.raffle_price_id, "price_123");
    }

    #[test]
    fn startup_validation_rejects_bad_limits() {
        let server = ServerConfig::default();
        let raffle = RaffleConfig {
            stripe_page_limit: 250,
            ..RaffleConfig::default()
        };
        let err = validate_startup_config(&server, &raffle).expect_err("page limit");
        assert!(err.contains("page limit"));

        let raffle = RaffleConfig {
            session_secret: Some("short".to_string()),
            ..RaffleConfig::default()
        };
        let err = validate_startup_config(&server, &raffle).expect_err("short secret");
        assert!(err.contains("16 bytes"));

        assert!(validate_startup_config(&server, &RaffleConfig::default()).is_ok());
    }

    #[test]
    fn oversized_page_limit_is_rejected_not_truncated() {
        let err = stripe_page_limit_from_raw(u64::from(u32::MAX) + 51).expect_err("overflow");
        assert!(err.contains("4294967346"));
        assert_eq!(stripe_page_limit_from_raw(50), Ok(50));

        let raffle = RaffleConfig {
            stripe_page_limit: stripe_page_limit_from_raw(500).expect("fits u32"),
            ..RaffleConfig::default()
        };
        assert!(validate_startup_config(&ServerConfig::default(), &raffle).is_err());
    }
}
