// SPDX-License-Identifier: Apache-2.0

use super::utilities::with_cache_control;
use crate::AppState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::atomic::Ordering;

const ROBOTS_MAX_AGE_SECS: u64 = 86_400;
const SITEMAP_MAX_AGE_SECS: u64 = 3_600;

pub(crate) async fn healthz_handler() -> Response {
    (StatusCode::OK, "ok").into_response()
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    if state.accepting_requests.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response()
    }
}

pub(crate) async fn robots_handler() -> Response {
    let resp = (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain")],
        crate::site::robots_txt(),
    )
        .into_response();
    with_cache_control(resp, ROBOTS_MAX_AGE_SECS)
}

pub(crate) async fn sitemap_handler(State(state): State<AppState>) -> Response {
    let resp = (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/xml")],
        crate::site::sitemap_xml(&state.server.site_base_url),
    )
        .into_response();
    with_cache_control(resp, SITEMAP_MAX_AGE_SECS)
}

pub(crate) async fn event_handler() -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/ld+json")],
        crate::site::event_json_ld().to_string(),
    )
        .into_response()
}
