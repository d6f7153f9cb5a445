// SPDX-License-Identifier: Apache-2.0

use super::{CheckoutSessionSource, RetryPolicy};
use async_trait::async_trait;
use openstreets_raffle_core::{RaffleError, SessionPage};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{instrument, warn};

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const STRIPE_API_VERSION: &str = "2025-03-31.basil";
pub const STRIPE_MAX_PAGE_LIMIT: u32 = 100;

const ERROR_BODY_SNIPPET_BYTES: usize = 512;

/// Lists completed checkout sessions with their line items expanded.
pub struct StripeCheckoutSource {
    api_base: String,
    secret_key: String,
    page_limit: u32,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl StripeCheckoutSource {
    #[must_use]
    pub fn new(api_base: &str, secret_key: String, page_limit: u32, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            page_limit: page_limit.clamp(1, STRIPE_MAX_PAGE_LIMIT),
            retry,
            client,
        }
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.api_base)
    }

    fn query(&self, starting_after: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", self.page_limit.to_string()),
            ("status", "complete".to_string()),
            ("expand[]", "data.line_items".to_string()),
        ];
        if let Some(cursor) = starting_after {
            query.push(("starting_after", cursor.to_string()));
        }
        query
    }

    fn headers(&self) -> Result<HeaderMap, RaffleError> {
        let mut headers = HeaderMap::new();
        headers.insert("stripe-version", HeaderValue::from_static(STRIPE_API_VERSION));
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.secret_key))
            .map_err(|e| RaffleError::configuration(format!("invalid stripe secret key: {e}")))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        Ok(headers)
    }

    #[instrument(name = "stripe_list_sessions_with_retry", skip(self))]
    async fn get_page_with_retry(
        &self,
        starting_after: Option<&str>,
    ) -> Result<SessionPage, RaffleError> {
        let url = self.sessions_url();
        let headers = self.headers()?;
        let query = self.query(starting_after);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let req = self.client.get(&url).headers(headers.clone()).query(&query);
            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<SessionPage>()
                        .await
                        .map_err(|e| RaffleError::upstream(format!("session page parse failed: {e}")));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let snippet: String = body.chars().take(ERROR_BODY_SNIPPET_BYTES).collect();
                    if !is_retryable(status) || attempt >= self.retry.max_attempts {
                        return Err(RaffleError::upstream(format!(
                            "session list failed status={status} attempt={attempt} body={snippet}"
                        )));
                    }
                    warn!(status = status.as_u16(), attempt, "stripe session list retrying");
                }
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(RaffleError::upstream(format!(
                            "session list failed attempt={attempt}: {e}"
                        )));
                    }
                    warn!(attempt, "stripe session list transport error, retrying: {e}");
                }
            }
            tokio::time::sleep(Duration::from_millis(
                self.retry.base_backoff_ms.saturating_mul(attempt as u64),
            ))
            .await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl CheckoutSessionSource for StripeCheckoutSource {
    fn source_tag(&self) -> &'static str {
        "stripe"
    }

    async fn list_page(&self, starting_after: Option<&str>) -> Result<SessionPage, RaffleError> {
        self.get_page_with_retry(starting_after).await
    }
}
