// SPDX-License-Identifier: Apache-2.0

use super::CheckoutSessionSource;
use async_trait::async_trait;
use openstreets_raffle_core::{CheckoutSession, RaffleError, SessionPage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// In-memory session listing that pages the way the provider does, by
/// `starting_after` cursor.
pub struct FakeCheckoutSource {
    pub sessions: Mutex<Vec<CheckoutSession>>,
    pub page_size: usize,
    pub fetch_calls: AtomicU64,
    pub cursors_seen: Mutex<Vec<Option<String>>>,
    pub fail_with: Mutex<Option<String>>,
    pub slow_read_delay: Duration,
}

impl Default for FakeCheckoutSource {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            page_size: 100,
            fetch_calls: AtomicU64::new(0),
            cursors_seen: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            slow_read_delay: Duration::from_millis(0),
        }
    }
}

impl FakeCheckoutSource {
    #[must_use]
    pub fn with_sessions(sessions: Vec<CheckoutSession>, page_size: usize) -> Self {
        Self {
            sessions: Mutex::new(sessions),
            page_size: page_size.max(1),
            ..Self::default()
        }
    }
}

#[async_trait]
impl CheckoutSessionSource for FakeCheckoutSource {
    fn source_tag(&self) -> &'static str {
        "fake"
    }

    async fn list_page(&self, starting_after: Option<&str>) -> Result<SessionPage, RaffleError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.cursors_seen
            .lock()
            .await
            .push(starting_after.map(ToString::to_string));
        if !self.slow_read_delay.is_zero() {
            tokio::time::sleep(self.slow_read_delay).await;
        }
        if let Some(message) = self.fail_with.lock().await.clone() {
            return Err(RaffleError::upstream(message));
        }
        let sessions = self.sessions.lock().await;
        let start = match starting_after {
            Some(cursor) => sessions
                .iter()
                .position(|s| s.id == cursor)
                .map(|i| i + 1)
                .ok_or_else(|| RaffleError::upstream(format!("unknown cursor {cursor}")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(sessions.len());
        Ok(SessionPage {
            data: sessions[start..end].to_vec(),
            has_more: end < sessions.len(),
        })
    }
}
