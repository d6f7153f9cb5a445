// SPDX-License-Identifier: Apache-2.0

//! Admin raffle endpoints. Every failure leaves here as `{"error": "..."}`;
//! upstream detail stays in the logs.

use super::request_tracing::RequestTrace;
use super::utilities::error_response;
use crate::raffle_service::{clear_history, load_history, record_winner, run_draw};
use crate::session::{expired_session_cookie, password_matches, session_cookie};
use crate::single_flight::DRAW_RESOURCE;
use crate::AppState;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use openstreets_raffle_core::{DrawOutcome, DrawResult, RaffleErrorKind};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub(crate) const CONFIG_MISSING_DETAIL: &str =
    "Server configuration missing (Stripe Key, Price ID, or Admin Password).";
pub(crate) const CONFIG_MISSING: &str = "Server configuration missing.";
pub(crate) const INVALID_PASSWORD: &str = "Invalid password.";
pub(crate) const INVALID_LOGIN_REQUEST: &str = "Invalid login request.";
pub(crate) const NOT_AUTHENTICATED: &str = "Not authenticated.";
pub(crate) const NO_TICKETS: &str = "No paid raffle tickets found for the specified product ID.";
pub(crate) const DRAW_FAILED: &str = "Failed to draw winner.";
pub(crate) const DRAW_IN_PROGRESS: &str = "draw already in progress";
pub(crate) const HISTORY_FAILED: &str = "Failed to read winner history.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminStatus {
    is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_settings: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawResponse<'a> {
    #[serde(flatten)]
    result: &'a DrawResult,
    history_recorded: bool,
}

/// Reads the password from a JSON body, or from a urlencoded form post.
async fn read_login_request(req: Request, state: &AppState) -> Result<LoginRequest, String> {
    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        Form::<LoginRequest>::from_request(req, state)
            .await
            .map(|Form(body)| body)
            .map_err(|e| e.body_text())
    } else {
        Json::<LoginRequest>::from_request(req, state)
            .await
            .map(|Json(body)| body)
            .map_err(|e| e.body_text())
    }
}

fn set_cookie(mut resp: Response, cookie: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(cookie) {
        resp.headers_mut().insert(SET_COOKIE, v);
    }
    resp
}

pub(crate) async fn admin_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let missing_settings = state.raffle.missing_settings();
    let status = if missing_settings.is_empty() {
        AdminStatus {
            is_authenticated: state.is_admin(&headers),
            error: None,
            missing_settings,
        }
    } else {
        AdminStatus {
            is_authenticated: false,
            error: Some(CONFIG_MISSING_DETAIL),
            missing_settings,
        }
    };
    Json(status).into_response()
}

pub(crate) async fn admin_login_handler(
    State(state): State<AppState>,
    Extension(trace): Extension<RequestTrace>,
    req: Request,
) -> Response {
    let creds = match state.raffle.credentials() {
        Ok(creds) => creds,
        Err(e) => {
            warn!(request_id = %trace.request_id, "raffle login refused: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, CONFIG_MISSING);
        }
    };
    let Some(sessions) = &state.sessions else {
        warn!(request_id = %trace.request_id, "raffle login refused: no session signer");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, CONFIG_MISSING);
    };
    let body = match read_login_request(req, &state).await {
        Ok(body) => body,
        Err(detail) => {
            warn!(request_id = %trace.request_id, "raffle login body rejected: {detail}");
            return error_response(StatusCode::BAD_REQUEST, INVALID_LOGIN_REQUEST);
        }
    };
    if !password_matches(creds.admin_password, &body.password) {
        warn!(target: "raffle_audit", request_id = %trace.request_id, "raffle admin login rejected");
        return error_response(StatusCode::UNAUTHORIZED, INVALID_PASSWORD);
    }
    let (token, ttl) = sessions.issue();
    info!(target: "raffle_audit", request_id = %trace.request_id, "raffle admin login accepted");
    let resp = Json(serde_json::json!({ "isAuthenticated": true })).into_response();
    set_cookie(
        resp,
        &session_cookie(&token, ttl, state.raffle.secure_cookies),
    )
}

pub(crate) async fn admin_logout_handler(State(state): State<AppState>) -> Response {
    let resp = Json(serde_json::json!({ "isAuthenticated": false })).into_response();
    set_cookie(resp, &expired_session_cookie(state.raffle.secure_cookies))
}

pub(crate) async fn admin_draw_handler(
    State(state): State<AppState>,
    Extension(trace): Extension<RequestTrace>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = state.raffle.credentials() {
        warn!(request_id = %trace.request_id, "raffle draw refused: {e}");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, CONFIG_MISSING);
    }
    if !state.is_admin(&headers) {
        return error_response(StatusCode::FORBIDDEN, NOT_AUTHENTICATED);
    }
    let Some(_flight) = state.draws.try_acquire(DRAW_RESOURCE) else {
        warn!(request_id = %trace.request_id, "raffle draw rejected: another draw is running");
        return error_response(StatusCode::CONFLICT, DRAW_IN_PROGRESS);
    };

    let outcome = match run_draw(&state).await {
        Ok(outcome) => outcome,
        Err(e) if e.kind() == RaffleErrorKind::Configuration => {
            warn!(request_id = %trace.request_id, "raffle draw refused: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, CONFIG_MISSING);
        }
        Err(e) => {
            error!(request_id = %trace.request_id, "raffle draw failed: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, DRAW_FAILED);
        }
    };

    let result = match outcome {
        DrawOutcome::Winner(result) => result,
        DrawOutcome::NoQualifyingTickets => {
            info!(target: "raffle_audit", request_id = %trace.request_id, "raffle draw found no tickets");
            return error_response(StatusCode::OK, NO_TICKETS);
        }
    };

    let history_recorded = match record_winner(&state, &result).await {
        Ok(appended) => appended,
        Err(e) => {
            warn!(request_id = %trace.request_id, "winner history not updated: {e}");
            false
        }
    };
    info!(
        target: "raffle_audit",
        request_id = %trace.request_id,
        winner_tickets = result.winner_ticket_count,
        total_tickets = result.total_ticket_count,
        participants = result.participant_count,
        history_recorded,
        "raffle winner drawn"
    );
    Json(DrawResponse {
        result: &result,
        history_recorded,
    })
    .into_response()
}

pub(crate) async fn admin_history_handler(
    State(state): State<AppState>,
    Extension(trace): Extension<RequestTrace>,
    headers: HeaderMap,
) -> Response {
    if !state.is_admin(&headers) {
        return error_response(StatusCode::FORBIDDEN, NOT_AUTHENTICATED);
    }
    match load_history(&state).await {
        Ok(history) => Json(history.entries()).into_response(),
        Err(e) => {
            error!(request_id = %trace.request_id, "winner history read failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, HISTORY_FAILED)
        }
    }
}

pub(crate) async fn admin_clear_history_handler(
    State(state): State<AppState>,
    Extension(trace): Extension<RequestTrace>,
    headers: HeaderMap,
) -> Response {
    if !state.is_admin(&headers) {
        return error_response(StatusCode::FORBIDDEN, NOT_AUTHENTICATED);
    }
    match clear_history(&state).await {
        Ok(()) => {
            info!(target: "raffle_audit", request_id = %trace.request_id, "winner history cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!(request_id = %trace.request_id, "winner history clear failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, HISTORY_FAILED)
        }
    }
}
