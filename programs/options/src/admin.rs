//! Owner-controlled engine parameters

use serde::{Deserialize, Serialize};
use strike_common::{Domain, Event, Identity, ProtocolError, Result};

/// Default processing fee on expiry (0.5%)
pub const DEFAULT_FEE_BPS: u16 = 50;

/// Fee ceiling (5%)
pub const MAX_FEE_BPS: u16 = 500;

/// Default floor between open and settlement, in seconds
pub const DEFAULT_MIN_SETTLEMENT_DELAY: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub owner: Identity,
    /// Designated price signer
    pub oracle: Identity,
    /// Submits signed open requests and may cancel positions
    pub operator: Identity,
    /// Only caller allowed into the pre-transfer hook
    pub order_book: Identity,
    /// Token account holding position collateral
    pub custody: Identity,
    /// The one accepted collateral token (the pool asset)
    pub asset: Identity,
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u16,
    #[serde(default = "default_min_settlement_delay")]
    pub min_settlement_delay: u64,
    #[serde(default)]
    pub domain: Domain,
}

fn default_fee_bps() -> u16 {
    DEFAULT_FEE_BPS
}

fn default_min_settlement_delay() -> u64 {
    DEFAULT_MIN_SETTLEMENT_DELAY
}

impl AdminConfig {
    pub fn new(owner: Identity, custody: Identity, asset: Identity) -> Self {
        Self {
            owner,
            oracle: owner,
            operator: owner,
            order_book: owner,
            custody,
            asset,
            fee_bps: DEFAULT_FEE_BPS,
            min_settlement_delay: DEFAULT_MIN_SETTLEMENT_DELAY,
            domain: Domain::default(),
        }
    }

    pub fn ensure_owner(&self, caller: &Identity) -> Result<()> {
        if *caller != self.owner {
            log::warn!("admin call rejected for {}", caller);
            return Err(ProtocolError::Unauthorized);
        }
        Ok(())
    }

    pub fn ensure_operator(&self, caller: &Identity) -> Result<()> {
        if *caller != self.operator {
            log::warn!("operator call rejected for {}", caller);
            return Err(ProtocolError::Unauthorized);
        }
        Ok(())
    }

    // Setters return the event to record; the engine owns the journal.

    pub fn set_oracle(&mut self, caller: &Identity, oracle: Identity) -> Result<Event> {
        self.ensure_owner(caller)?;
        self.oracle = oracle;
        Ok(Event::OracleUpdated { oracle })
    }

    pub fn set_operator(&mut self, caller: &Identity, operator: Identity) -> Result<Event> {
        self.ensure_owner(caller)?;
        self.operator = operator;
        Ok(Event::OperatorUpdated { operator })
    }

    pub fn set_order_book(&mut self, caller: &Identity, order_book: Identity) -> Result<Event> {
        self.ensure_owner(caller)?;
        self.order_book = order_book;
        Ok(Event::OrderBookUpdated { order_book })
    }

    pub fn set_fee_bps(&mut self, caller: &Identity, fee_bps: u16) -> Result<Event> {
        self.ensure_owner(caller)?;
        if fee_bps > MAX_FEE_BPS {
            return Err(ProtocolError::FeeTooHigh);
        }
        self.fee_bps = fee_bps;
        Ok(Event::FeeUpdated { fee_bps })
    }

    pub fn set_min_settlement_delay(&mut self, caller: &Identity, secs: u64) -> Result<Event> {
        self.ensure_owner(caller)?;
        self.min_settlement_delay = secs;
        Ok(Event::SettlementDelayUpdated { secs })
    }
}
