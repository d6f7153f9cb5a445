// SPDX-License-Identifier: Apache-2.0

//! Upstream payment-provider access.

pub mod fake;
pub mod stripe;

use async_trait::async_trait;
use openstreets_raffle_core::{CheckoutSession, RaffleError, SessionPage};

pub const DEFAULT_MAX_PAGES: usize = 1000;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 200,
        }
    }
}

/// Paginated listing of completed checkout sessions.
#[async_trait]
pub trait CheckoutSessionSource: Send + Sync {
    fn source_tag(&self) -> &'static str;

    async fn list_page(&self, starting_after: Option<&str>) -> Result<SessionPage, RaffleError>;
}

/// Walks a [`CheckoutSessionSource`] one page at a time, using the last
/// session id of each page as the cursor for the next.
pub struct SessionPager<'a> {
    source: &'a dyn CheckoutSessionSource,
    cursor: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
    max_pages: usize,
}

impl<'a> SessionPager<'a> {
    #[must_use]
    pub fn new(source: &'a dyn CheckoutSessionSource) -> Self {
        Self::with_max_pages(source, DEFAULT_MAX_PAGES)
    }

    #[must_use]
    pub fn with_max_pages(source: &'a dyn CheckoutSessionSource, max_pages: usize) -> Self {
        Self {
            source,
            cursor: None,
            exhausted: false,
            pages_fetched: 0,
            max_pages,
        }
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.exhausted
    }

    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub async fn next_page(&mut self) -> Result<Vec<CheckoutSession>, RaffleError> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        if self.pages_fetched >= self.max_pages {
            self.exhausted = true;
            return Err(RaffleError::upstream(format!(
                "pagination exceeded {} pages from {}",
                self.max_pages,
                self.source.source_tag()
            )));
        }
        let page = self.source.list_page(self.cursor.as_deref()).await?;
        self.pages_fetched += 1;
        match page.data.last() {
            // An empty page that claims more would loop forever.
            Some(last) if page.has_more => self.cursor = Some(last.id.clone()),
            _ => self.exhausted = true,
        }
        Ok(page.data)
    }
}
