//! Shared liquidity pool: LP shares, manager loans and the rate curve

pub mod rate;
pub mod loan;
pub mod ledger;

pub use rate::*;
pub use loan::*;
pub use ledger::*;
