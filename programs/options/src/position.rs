//! Binary option positions and their win conditions

use serde::{Deserialize, Serialize};
use strike_common::{Identity, OrderRef, PositionId, ProtocolError, Result, Timestamp};

/// Option variant; the ordinal is part of the signed request
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    /// Price finishes above/below strike
    HighLow = 0,
    /// Price reaches strike
    OneTouch = 1,
    /// Price stays short of strike
    NoTouch = 2,
    /// Price inside `[lower, upper]`
    Boundary = 3,
    /// Price outside `[lower, upper]`
    OutOfBounds = 4,
}

impl OptionType {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::HighLow),
            1 => Some(Self::OneTouch),
            2 => Some(Self::NoTouch),
            3 => Some(Self::Boundary),
            4 => Some(Self::OutOfBounds),
            _ => None,
        }
    }

    /// Range variants read the boundaries instead of strike and direction
    pub fn is_range(self) -> bool {
        matches!(self, Self::Boundary | Self::OutOfBounds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Active,
    Won,
    Lost,
    Expired,
    Cancelled,
}

impl PositionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Payout terms of an option, shared by requests and stored positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terms {
    pub option_type: OptionType,
    pub is_call: bool,
    pub strike_price: u128,
    #[serde(default)]
    pub boundary_lower: u128,
    #[serde(default)]
    pub boundary_upper: u128,
}

impl Terms {
    /// Range variants need `lower <= upper`
    pub fn validate(&self) -> Result<()> {
        if self.option_type.is_range() && self.boundary_lower > self.boundary_upper {
            return Err(ProtocolError::InvalidBounds);
        }
        Ok(())
    }

    /// Win condition at settlement `price`
    ///
    /// | type        | call                    | put            |
    /// |-------------|-------------------------|----------------|
    /// | HighLow     | price > strike          | price < strike |
    /// | OneTouch    | price >= strike         | price <= strike|
    /// | NoTouch     | price < strike          | price > strike |
    /// | Boundary    | lower <= price <= upper | same           |
    /// | OutOfBounds | price outside range     | same           |
    pub fn wins(&self, price: u128) -> bool {
        let strike = self.strike_price;
        match (self.option_type, self.is_call) {
            (OptionType::HighLow, true) => price > strike,
            (OptionType::HighLow, false) => price < strike,
            (OptionType::OneTouch, true) => price >= strike,
            (OptionType::OneTouch, false) => price <= strike,
            (OptionType::NoTouch, true) => price < strike,
            (OptionType::NoTouch, false) => price > strike,
            (OptionType::Boundary, _) => {
                self.boundary_lower <= price && price <= self.boundary_upper
            }
            (OptionType::OutOfBounds, _) => {
                price < self.boundary_lower || price > self.boundary_upper
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub id: PositionId,
    pub user: Identity,
    pub collateral_token: Identity,
    pub collateral_amount: u128,
    /// Gross amount paid on a win (stake included)
    pub potential_payout: u128,
    pub expiry: Timestamp,
    pub terms: Terms,
    pub open_price: u128,
    pub order_ref: OrderRef,
    pub status: PositionStatus,
    pub open_timestamp: Timestamp,
}

impl Position {
    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    pub fn wins(&self, price: u128) -> bool {
        self.terms.wins(price)
    }
}
