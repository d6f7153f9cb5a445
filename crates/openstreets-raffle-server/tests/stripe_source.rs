// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use openstreets_raffle_core::RaffleErrorKind;
use openstreets_raffle_server::{
    CheckoutSessionSource, RetryPolicy, SessionPager, StripeCheckoutSource, STRIPE_API_VERSION,
};
use serde_json::json;

#[derive(Clone, Default)]
struct MockStripe {
    calls: Arc<AtomicU64>,
    fail_first_with: Option<u16>,
}

fn session(id: &str, email: &str, quantity: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "object": "checkout.session",
        "status": "complete",
        "payment_status": "paid",
        "customer_details": { "email": email, "name": null, "phone": null },
        "line_items": {
            "object": "list",
            "data": [{ "price": { "id": "price_raffle" }, "quantity": quantity }],
            "has_more": false
        }
    })
}

async fn list_sessions(
    State(mock): State<MockStripe>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let call = mock.calls.fetch_add(1, Ordering::SeqCst);
    if let (Some(code), 0) = (mock.fail_first_with, call) {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "error": { "message": "mock failure" } }))).into_response();
    }
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sk_test_mock") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    if headers.get("stripe-version").and_then(|v| v.to_str().ok()) != Some(STRIPE_API_VERSION) {
        return (StatusCode::BAD_REQUEST, "missing version").into_response();
    }
    if query.get("status").map(String::as_str) != Some("complete")
        || query.get("expand[]").map(String::as_str) != Some("data.line_items")
    {
        return (StatusCode::BAD_REQUEST, "missing filter").into_response();
    }
    let page = match query.get("starting_after").map(String::as_str) {
        None => json!({
            "object": "list",
            "data": [
                session("cs_a", "a@example.org", json!(2)),
                session("cs_b", "b@example.org", json!("3")),
            ],
            "has_more": true
        }),
        Some("cs_b") => json!({
            "object": "list",
            "data": [session("cs_c", "a@example.org", json!(null))],
            "has_more": false
        }),
        Some(_) => return (StatusCode::BAD_REQUEST, "unknown cursor").into_response(),
    };
    Json(page).into_response()
}

async fn spawn_mock(mock: MockStripe) -> String {
    let app = Router::new()
        .route("/v1/checkout/sessions", get(list_sessions))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve mock") });
    format!("http://{addr}")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_backoff_ms: 1,
    }
}

#[tokio::test]
async fn pages_through_listing_with_cursor_and_lenient_quantities() {
    let mock = MockStripe::default();
    let base = spawn_mock(mock.clone()).await;
    let source = StripeCheckoutSource::new(&base, "sk_test_mock".to_string(), 2, fast_retry());

    let mut pager = SessionPager::new(&source);
    let mut sessions = Vec::new();
    while pager.has_next() {
        sessions.extend(pager.next_page().await.expect("page"));
    }
    let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["cs_a", "cs_b", "cs_c"]);
    assert_eq!(mock.calls.load(Ordering::SeqCst), 2);

    let quantities: Vec<_> = sessions
        .iter()
        .filter_map(|s| s.line_items.as_ref())
        .flat_map(|items| items.data.iter().map(|i| i.ticket_quantity()))
        .collect();
    assert_eq!(quantities, vec![2, 3, 1]);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let mock = MockStripe {
        fail_first_with: Some(503),
        ..MockStripe::default()
    };
    let base = spawn_mock(mock.clone()).await;
    let source = StripeCheckoutSource::new(&base, "sk_test_mock".to_string(), 100, fast_retry());
    let page = source.list_page(None).await.expect("retried page");
    assert_eq!(page.data.len(), 2);
    assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn auth_failures_are_not_retried() {
    let mock = MockStripe::default();
    let base = spawn_mock(mock.clone()).await;
    let source = StripeCheckoutSource::new(&base, "sk_test_wrong".to_string(), 100, fast_retry());
    let err = source.list_page(None).await.expect_err("unauthorized");
    assert_eq!(err.kind(), RaffleErrorKind::UpstreamFetch);
    assert!(err.message().contains("401"));
    assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
}
