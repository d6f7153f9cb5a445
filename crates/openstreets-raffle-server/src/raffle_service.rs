// SPDX-License-Identifier: Apache-2.0

use crate::upstream::{CheckoutSessionSource, SessionPager};
use crate::AppState;
use chrono::Utc;
use openstreets_raffle_core::{
    DrawOutcome, DrawResult, RaffleDrawer, RaffleError, TicketPool, WinnerHistory,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, instrument};

/// Pages through every completed session and keeps the raffle purchases.
#[instrument(name = "raffle_collect_pool", skip(source, drawer), fields(price_id = drawer.price_id()))]
pub(crate) async fn collect_pool(
    source: &dyn CheckoutSessionSource,
    drawer: &RaffleDrawer,
    max_pages: usize,
) -> Result<TicketPool, RaffleError> {
    let mut pager = SessionPager::with_max_pages(source, max_pages);
    let mut purchases = Vec::new();
    while pager.has_next() {
        let sessions = pager.next_page().await?;
        purchases.extend(drawer.purchases(&sessions));
    }
    debug!(
        pages = pager.pages_fetched(),
        purchases = purchases.len(),
        "raffle sessions collected"
    );
    TicketPool::from_purchases(purchases)
}

/// Fetches a fresh snapshot and draws once. Fails fast on missing settings
/// before any upstream call.
pub(crate) async fn run_draw(state: &AppState) -> Result<DrawOutcome, RaffleError> {
    let creds = state.raffle.credentials()?;
    let drawer = RaffleDrawer::new(creds.raffle_price_id);
    let pool = collect_pool(
        state.source.as_ref(),
        &drawer,
        state.raffle.stripe_max_pages,
    )
    .await?;
    let mut rng = StdRng::from_entropy();
    Ok(pool.draw(&mut rng))
}

/// Appends to the persisted history; returns whether a new entry was written.
pub(crate) async fn record_winner(
    state: &AppState,
    result: &DrawResult,
) -> Result<bool, RaffleError> {
    let _guard = state.history_lock.lock().await;
    let mut history = state.history.load()?;
    let appended = history.record(result, Utc::now());
    if appended {
        state.history.save(&history)?;
    }
    Ok(appended)
}

pub(crate) async fn load_history(state: &AppState) -> Result<WinnerHistory, RaffleError> {
    let _guard = state.history_lock.lock().await;
    state.history.load()
}

pub(crate) async fn clear_history(state: &AppState) -> Result<(), RaffleError> {
    let _guard = state.history_lock.lock().await;
    state.history.clear()
}
