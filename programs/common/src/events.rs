//! Ledger events
//!
//! Ledgers append to an in-memory journal on every committed transition;
//! the embedding service drains it (the keeper logs and persists them).

use crate::types::{Identity, PositionId, Timestamp};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // === pool ===
    Deposited {
        provider: Identity,
        amount: u128,
        shares: u128,
    },
    Withdrawn {
        provider: Identity,
        amount: u128,
        shares: u128,
    },
    Borrowed {
        loan_id: u64,
        borrower: Identity,
        amount: u128,
    },
    Repaid {
        loan_id: u64,
        payer: Identity,
        amount: u128,
    },
    Donated {
        donor: Identity,
        amount: u128,
    },
    InterestAccrued {
        amount: u128,
        total_assets: u128,
    },
    PaidOut {
        to: Identity,
        amount: u128,
    },
    ForfeitAbsorbed {
        from: Identity,
        amount: u128,
    },
    ManagerUpdated {
        manager: Identity,
    },

    // === positions ===
    PositionOpened {
        id: PositionId,
        user: Identity,
        option_type: u8,
        collateral: u128,
        potential_payout: u128,
        expiry: Timestamp,
    },
    PositionSettled {
        id: PositionId,
        won: bool,
        payout: u128,
    },
    PositionExpired {
        id: PositionId,
        refund: u128,
        fee: u128,
    },
    PositionCancelled {
        id: PositionId,
        refund: u128,
    },
    OrderCancelled {
        id: PositionId,
    },

    // === administration ===
    OracleUpdated {
        oracle: Identity,
    },
    OperatorUpdated {
        operator: Identity,
    },
    OrderBookUpdated {
        order_book: Identity,
    },
    FeeUpdated {
        fee_bps: u16,
    },
    SettlementDelayUpdated {
        secs: u64,
    },
    AssetsRecovered {
        to: Identity,
        amount: u128,
    },
}

/// Append-only event journal owned by a ledger
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        log::debug!("event: {:?}", event);
        self.events.push(event);
    }

    /// Events recorded since the last drain
    pub fn pending(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
