// SPDX-License-Identifier: Apache-2.0

//! Admin session tokens.
//!
//! Handlers only ask [`SessionValidator::validate`]; whether the token is a
//! signed cookie or a lookup in a server-side store is the validator's
//! business.

use crate::config::RaffleConfig;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const SESSION_COOKIE: &str = "raffle_session";
pub const SESSION_COOKIE_PATH: &str = "/admin";
const TOKEN_SCOPE: &str = "raffle-admin";
const PASSWORD_SCOPE: &str = "raffle-admin-password";

type HmacSha256 = Hmac<Sha256>;

pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str) -> bool;

    /// Returns a fresh token and how long it stays valid.
    fn issue(&self) -> (String, Duration);
}

/// Stateless tokens of the form `<expiry_unix>.<hex hmac>`.
pub struct SignedSessionStore {
    secret: Vec<u8>,
    ttl: Duration,
}

impl SignedSessionStore {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Uses `session_secret` when set, otherwise a key derived from the admin
    /// password. `None` when neither is configured.
    #[must_use]
    pub fn from_config(cfg: &RaffleConfig) -> Option<Self> {
        if let Some(secret) = cfg.session_secret.as_deref().filter(|s| !s.is_empty()) {
            return Some(Self::new(secret.as_bytes().to_vec(), cfg.session_ttl));
        }
        let password = cfg
            .admin_password
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())?;
        let mut hasher = Sha256::new();
        hasher.update(b"openstreets-raffle-session\n");
        hasher.update(password.as_bytes());
        Some(Self::new(hasher.finalize().to_vec(), cfg.session_ttl))
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).ok()
    }

    fn signature(&self, expiry: u64) -> Option<String> {
        let mut mac = self.mac()?;
        mac.update(format!("{TOKEN_SCOPE}\n{expiry}").as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    #[must_use]
    pub fn token_for_expiry(&self, expiry: u64) -> String {
        format!("{expiry}.{}", self.signature(expiry).unwrap_or_default())
    }

    fn validate_at(&self, token: &str, now: u64) -> bool {
        let Some((expiry_raw, sig_hex)) = token.trim().split_once('.') else {
            return false;
        };
        let Ok(expiry) = expiry_raw.parse::<u64>() else {
            return false;
        };
        if expiry <= now {
            return false;
        }
        let Ok(sig) = hex::decode(sig_hex) else {
            return false;
        };
        let Some(mut mac) = self.mac() else {
            return false;
        };
        mac.update(format!("{TOKEN_SCOPE}\n{expiry}").as_bytes());
        mac.verify_slice(&sig).is_ok()
    }
}

impl SessionValidator for SignedSessionStore {
    fn validate(&self, token: &str) -> bool {
        self.validate_at(token, unix_now_secs())
    }

    fn issue(&self) -> (String, Duration) {
        let expiry = unix_now_secs().saturating_add(self.ttl.as_secs().max(1));
        (self.token_for_expiry(expiry), self.ttl)
    }
}

pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Compares passwords through HMAC tags so the comparison time does not
/// depend on where the inputs first differ.
#[must_use]
pub fn password_matches(expected: &str, given: &str) -> bool {
    let Ok(mut expected_mac) = HmacSha256::new_from_slice(PASSWORD_SCOPE.as_bytes()) else {
        return false;
    };
    expected_mac.update(expected.as_bytes());
    let expected_tag = expected_mac.finalize().into_bytes();
    let Ok(mut given_mac) = HmacSha256::new_from_slice(PASSWORD_SCOPE.as_bytes()) else {
        return false;
    };
    given_mac.update(given.as_bytes());
    given_mac.verify_slice(&expected_tag).is_ok()
}

/// Session token from the session cookie, falling back to a bearer header.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty());
    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    })
}

#[must_use]
pub fn session_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path={SESSION_COOKIE_PATH}; Max-Age={}; HttpOnly; SameSite=Strict",
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[must_use]
pub fn expired_session_cookie(secure: bool) -> String {
    session_cookie("", Duration::ZERO, secure)
}
