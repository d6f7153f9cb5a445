// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod draw;
pub mod error;
pub mod history;
pub mod purchase;

pub use draw::{
    win_percentage, DrawOutcome, DrawResult, RaffleDrawer, TicketEntry, TicketPool, MAX_POOL_TICKETS,
};
pub use error::{RaffleError, RaffleErrorKind};
pub use history::{
    HistoryStore, JsonFileHistoryStore, MemoryHistoryStore, WinnerHistory, WinnerHistoryEntry,
    DUPLICATE_WINDOW_MS, WINNER_HISTORY_KEY,
};
pub use purchase::{
    extract_purchases, CheckoutSession, CustomerDetails, LineItem, LineItemList, PriceRef,
    PurchaseRecord, SessionPage,
};

pub const CRATE_NAME: &str = "openstreets-raffle-core";
