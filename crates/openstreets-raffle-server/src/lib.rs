// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use openstreets_raffle_core::{HistoryStore, JsonFileHistoryStore};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;

mod config;
mod http;
mod raffle_service;
mod session;
mod single_flight;
mod site;
mod upstream;

pub use config::{
    stripe_page_limit_from_raw, validate_startup_config, RaffleConfig, RaffleCredentials,
    ServerConfig, DEFAULT_SITE_BASE_URL, ENV_RAFFLE_ADMIN_PASSWORD, ENV_RAFFLE_PRICE_ID,
    ENV_STRIPE_SECRET_KEY,
};
pub use session::{
    password_matches, session_token, SessionValidator, SignedSessionStore, SESSION_COOKIE,
};
pub use single_flight::{SingleFlight, DRAW_RESOURCE};
pub use site::{event_json_ld, robots_txt, sitemap_xml, SITEMAP_ROUTES};
pub use upstream::fake::FakeCheckoutSource;
pub use upstream::stripe::{StripeCheckoutSource, DEFAULT_STRIPE_API_BASE, STRIPE_API_VERSION};
pub use upstream::{CheckoutSessionSource, RetryPolicy, SessionPager};

pub const CRATE_NAME: &str = "openstreets-raffle-server";

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<ServerConfig>,
    pub raffle: Arc<RaffleConfig>,
    pub source: Arc<dyn CheckoutSessionSource>,
    pub sessions: Option<Arc<dyn SessionValidator>>,
    pub history: Arc<dyn HistoryStore>,
    pub history_lock: Arc<Mutex<()>>,
    pub draws: Arc<SingleFlight>,
    pub request_id_seed: Arc<AtomicU64>,
    pub accepting_requests: Arc<AtomicBool>,
}

impl AppState {
    #[must_use]
    pub fn new(
        server: ServerConfig,
        raffle: RaffleConfig,
        source: Arc<dyn CheckoutSessionSource>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let sessions = SignedSessionStore::from_config(&raffle)
            .map(|s| Arc::new(s) as Arc<dyn SessionValidator>);
        Self {
            server: Arc::new(server),
            raffle: Arc::new(raffle),
            source,
            sessions,
            history,
            history_lock: Arc::new(Mutex::new(())),
            draws: Arc::new(SingleFlight::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Production wiring: the Stripe listing and the JSON history file.
    #[must_use]
    pub fn from_config(server: ServerConfig, raffle: RaffleConfig) -> Self {
        let source = Arc::new(StripeCheckoutSource::new(
            &raffle.stripe_api_base,
            raffle.stripe_secret_key.clone().unwrap_or_default(),
            raffle.stripe_page_limit,
            raffle.retry.clone(),
        ));
        let history = Arc::new(JsonFileHistoryStore::new(&raffle.history_dir));
        Self::new(server, raffle, source, history)
    }

    #[must_use]
    pub fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(sessions) = &self.sessions else {
            return false;
        };
        session_token(headers).is_some_and(|token| sessions.validate(&token))
    }
}

async fn request_context_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace = http::request_tracing::extract_request_trace(req.headers(), &state);
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(trace.clone());

    let resp = next.run(req).await;
    let mut resp = http::utilities::with_request_id(resp, &trace.request_id);
    if path.starts_with("/admin") {
        resp.headers_mut()
            .insert("x-robots-tag", HeaderValue::from_static("noindex"));
        if state.server.enable_audit_log {
            info!(
                target: "raffle_audit",
                method = %method,
                path = %path,
                status = resp.status().as_u16(),
                request_id = %trace.request_id,
                correlation_id = trace.correlation_id.as_deref().unwrap_or(""),
                latency_ms = started.elapsed().as_millis() as u64,
                "audit"
            );
        }
    }
    resp
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::site::healthz_handler))
        .route("/readyz", get(http::site::readyz_handler))
        .route("/robots.txt", get(http::site::robots_handler))
        .route("/sitemap.xml", get(http::site::sitemap_handler))
        .route("/event.jsonld", get(http::site::event_handler))
        .route("/admin/raffle", get(http::admin::admin_status_handler))
        .route("/admin/raffle/login", post(http::admin::admin_login_handler))
        .route("/admin/raffle/logout", post(http::admin::admin_logout_handler))
        .route("/admin/raffle/draw", post(http::admin::admin_draw_handler))
        .route(
            "/admin/raffle/history",
            get(http::admin::admin_history_handler).delete(http::admin::admin_clear_history_handler),
        )
        .layer(from_fn_with_state(state.clone(), request_context_middleware))
        .layer(DefaultBodyLimit::max(state.server.max_body_bytes))
        .with_state(state)
}
