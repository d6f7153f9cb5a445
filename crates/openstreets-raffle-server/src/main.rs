// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use openstreets_raffle_server::{
    build_router, stripe_page_limit_from_raw, validate_startup_config, AppState, RaffleConfig,
    RetryPolicy, ServerConfig, DEFAULT_SITE_BASE_URL, DEFAULT_STRIPE_API_BASE,
    ENV_RAFFLE_ADMIN_PASSWORD, ENV_RAFFLE_PRICE_ID, ENV_STRIPE_SECRET_KEY,
};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("RAFFLE_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let server_defaults = ServerConfig::default();
    let server = ServerConfig {
        bind_addr: env::var("RAFFLE_BIND").unwrap_or(server_defaults.bind_addr),
        site_base_url: env::var("RAFFLE_SITE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SITE_BASE_URL.to_string()),
        max_body_bytes: env_usize("RAFFLE_MAX_BODY_BYTES", server_defaults.max_body_bytes),
        shutdown_drain: env_duration_ms("RAFFLE_SHUTDOWN_DRAIN_MS", 2000),
        enable_audit_log: env_bool("RAFFLE_ENABLE_AUDIT_LOG", true),
    };
    let raffle_defaults = RaffleConfig::default();
    let raffle = RaffleConfig {
        stripe_secret_key: env_secret(ENV_STRIPE_SECRET_KEY),
        raffle_price_id: env_secret(ENV_RAFFLE_PRICE_ID),
        admin_password: env_secret(ENV_RAFFLE_ADMIN_PASSWORD),
        session_secret: env_secret("RAFFLE_SESSION_SECRET"),
        session_ttl: Duration::from_secs(env_u64(
            "RAFFLE_SESSION_TTL_SECS",
            raffle_defaults.session_ttl.as_secs(),
        )),
        secure_cookies: env_bool("RAFFLE_SECURE_COOKIES", true),
        stripe_api_base: env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
        stripe_page_limit: stripe_page_limit_from_raw(env_u64(
            "RAFFLE_STRIPE_PAGE_LIMIT",
            u64::from(raffle_defaults.stripe_page_limit),
        ))?,
        stripe_max_pages: env_usize("RAFFLE_STRIPE_MAX_PAGES", raffle_defaults.stripe_max_pages),
        retry: RetryPolicy {
            max_attempts: env_usize("RAFFLE_STRIPE_RETRY_ATTEMPTS", 3),
            base_backoff_ms: env_u64("RAFFLE_STRIPE_RETRY_BASE_MS", 200),
        },
        history_dir: PathBuf::from(
            env::var("RAFFLE_HISTORY_DIR")
                .unwrap_or_else(|_| "artifacts/raffle-history".to_string()),
        ),
    };
    validate_startup_config(&server, &raffle)?;

    let missing = raffle.missing_settings();
    if !missing.is_empty() {
        // The site still serves; only the raffle admin reports itself unavailable.
        warn!(missing = ?missing, "raffle settings incomplete, draws disabled");
    }

    let bind_addr = server.bind_addr.clone();
    let drain = server.shutdown_drain;
    let state = AppState::from_config(server, raffle);
    let app = build_router(state.clone());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("openstreets-raffle-server listening on {bind_addr}");
    let accepting = state.accepting_requests.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            accepting.store(false, Ordering::Relaxed);
            tokio::time::sleep(drain).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
