// SPDX-License-Identifier: Apache-2.0

//! Ticket-weighted lottery.
//!
//! Every purchased ticket becomes one entry in a flat list and the winner is
//! a uniform pick over that list, so a buyer's odds are proportional to the
//! tickets they hold. Full expansion is fine at hundreds of tickets; a
//! cumulative-weight search would replace it at much higher volumes.

use crate::error::RaffleError;
use crate::purchase::{extract_purchases, CheckoutSession, PurchaseRecord};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on tickets in one draw. A real listing never gets near it, so
/// a larger count means the upstream data is malformed.
pub const MAX_POOL_TICKETS: u64 = 1_000_000;

/// A single physical ticket, pointing back at the purchase it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketEntry {
    purchase: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TicketPool {
    purchases: Vec<PurchaseRecord>,
    entries: Vec<TicketEntry>,
    tally: BTreeMap<String, u64>,
    total_tickets: u64,
}

impl TicketPool {
    /// Expands purchases into one entry per ticket. Fails when the ticket
    /// count overflows or exceeds [`MAX_POOL_TICKETS`], which only malformed
    /// upstream data produces.
    pub fn from_purchases(purchases: Vec<PurchaseRecord>) -> Result<Self, RaffleError> {
        let mut tally: BTreeMap<String, u64> = BTreeMap::new();
        let mut total_tickets = 0_u64;
        for record in &purchases {
            total_tickets = total_tickets
                .checked_add(record.quantity)
                .filter(|total| *total <= MAX_POOL_TICKETS)
                .ok_or_else(|| {
                    RaffleError::upstream(format!(
                        "ticket count exceeds {MAX_POOL_TICKETS} (purchase of {} by {})",
                        record.quantity, record.email
                    ))
                })?;
            *tally.entry(record.email.clone()).or_insert(0) += record.quantity;
        }
        let mut entries = Vec::with_capacity(total_tickets as usize);
        for (idx, record) in purchases.iter().enumerate() {
            entries.extend((0..record.quantity).map(|_| TicketEntry { purchase: idx }));
        }
        Ok(Self {
            purchases,
            entries,
            tally,
            total_tickets,
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[TicketEntry] {
        &self.entries
    }

    #[must_use]
    pub fn holder(&self, entry: TicketEntry) -> &PurchaseRecord {
        &self.purchases[entry.purchase]
    }

    #[must_use]
    pub fn tally(&self) -> &BTreeMap<String, u64> {
        &self.tally
    }

    #[must_use]
    pub fn total_tickets(&self) -> u64 {
        self.total_tickets
    }

    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.tally.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> DrawOutcome {
        if self.entries.is_empty() {
            return DrawOutcome::NoQualifyingTickets;
        }
        let winner = self.holder(self.entries[rng.gen_range(0..self.entries.len())]);
        let winner_ticket_count = self.tally.get(&winner.email).copied().unwrap_or(0);
        DrawOutcome::Winner(DrawResult {
            winner_email: winner.email.clone(),
            winner_name: winner.name.clone(),
            winner_phone: winner.phone.clone(),
            winner_ticket_count,
            participant_count: self.participant_count(),
            total_ticket_count: self.total_tickets,
            win_percentage: win_percentage(winner_ticket_count, self.total_tickets),
        })
    }
}

#[must_use]
pub fn win_percentage(tickets: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (tickets as f64 / total as f64) * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub winner_email: String,
    pub winner_name: Option<String>,
    pub winner_phone: Option<String>,
    pub winner_ticket_count: u64,
    pub participant_count: usize,
    pub total_ticket_count: u64,
    pub win_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    Winner(DrawResult),
    NoQualifyingTickets,
}

impl DrawOutcome {
    #[must_use]
    pub fn winner(&self) -> Option<&DrawResult> {
        match self {
            Self::Winner(result) => Some(result),
            Self::NoQualifyingTickets => None,
        }
    }
}

/// Draws a winner among sessions for one configured ticket price.
#[derive(Debug, Clone)]
pub struct RaffleDrawer {
    price_id: String,
}

impl RaffleDrawer {
    #[must_use]
    pub fn new(price_id: impl Into<String>) -> Self {
        Self {
            price_id: price_id.into(),
        }
    }

    #[must_use]
    pub fn price_id(&self) -> &str {
        &self.price_id
    }

    #[must_use]
    pub fn purchases<'a, I>(&self, sessions: I) -> Vec<PurchaseRecord>
    where
        I: IntoIterator<Item = &'a CheckoutSession>,
    {
        extract_purchases(sessions, &self.price_id)
    }

    pub fn pool<'a, I>(&self, sessions: I) -> Result<TicketPool, RaffleError>
    where
        I: IntoIterator<Item = &'a CheckoutSession>,
    {
        TicketPool::from_purchases(self.purchases(sessions))
    }

    pub fn draw<'a, I, R>(&self, sessions: I, rng: &mut R) -> Result<DrawOutcome, RaffleError>
    where
        I: IntoIterator<Item = &'a CheckoutSession>,
        R: Rng + ?Sized,
    {
        Ok(self.pool(sessions)?.draw(rng))
    }
}
