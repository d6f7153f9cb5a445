// SPDX-License-Identifier: Apache-2.0

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

pub(crate) fn with_cache_control(mut response: Response, max_age_secs: u64) -> Response {
    if let Ok(v) = HeaderValue::from_str(&format!("public, max-age={max_age_secs}")) {
        response
            .headers_mut()
            .insert(axum::http::header::CACHE_CONTROL, v);
    }
    response
}
