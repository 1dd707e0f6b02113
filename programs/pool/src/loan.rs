//! Loan records
//!
//! Loans are append-only: created by `borrow`, never removed. Only `repaid`
//! changes after creation, and only upward.

use model_safety::helpers::outstanding_of;
use model_safety::math::{mul_div, WAD};
use serde::Serialize;
use strike_common::{Identity, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Loan {
    pub borrower: Identity,
    /// Fixed at creation
    pub principal: u128,
    /// Creation time
    pub timestamp: Timestamp,
    /// Monotonically non-decreasing
    pub repaid: u128,
}

impl Loan {
    pub fn new(borrower: Identity, principal: u128, timestamp: Timestamp) -> Self {
        Self {
            borrower,
            principal,
            timestamp,
            repaid: 0,
        }
    }

    /// Principal not yet covered by repayments (clipped at zero)
    pub fn outstanding_principal(&self) -> u128 {
        outstanding_of(self.principal, self.repaid)
    }

    /// `principal * rate * elapsed / 1e18` for a per-second `rate` in 1e18
    /// fixed point; `None` on overflow of the 128-bit result
    pub fn interest_at_rate(&self, rate_per_second: u128, now: Timestamp) -> Option<u128> {
        let elapsed = now.saturating_sub(self.timestamp) as u128;
        let rate_time = rate_per_second.checked_mul(elapsed)?;
        mul_div(self.principal, rate_time, WAD)
    }
}
