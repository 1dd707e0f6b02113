//! Invariant checking helpers
//!
//! Predicates over before/after snapshots of pool accounting. The ledgers
//! call none of these on the hot path; tests and the keeper's health report
//! do.

use crate::math::*;
use core::cmp::Ordering;

/// Pool accounting snapshot (assets and LP share supply)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PoolSnapshot {
    pub total_assets: u128,
    pub total_shares: u128,
}

impl PoolSnapshot {
    pub fn new(total_assets: u128, total_shares: u128) -> Self {
        Self {
            total_assets,
            total_shares,
        }
    }

    /// Assets backing one share in 1e18 fixed point (1.0 for an empty pool)
    pub fn assets_per_share(&self) -> u128 {
        if self.total_shares == 0 {
            return WAD;
        }
        wad_div(self.total_assets, self.total_shares).unwrap_or(u128::MAX)
    }
}

/// No value leakage: assets per share did not drop between snapshots
///
/// Compared by cross-multiplication so rounding in `assets_per_share`
/// cannot hide a one-unit leak. Transitions from or to an empty pool are
/// trivially fine.
pub fn assets_per_share_non_decreasing(before: &PoolSnapshot, after: &PoolSnapshot) -> bool {
    if before.total_shares == 0 || after.total_shares == 0 {
        return true;
    }
    // after.assets / after.shares >= before.assets / before.shares
    cmp_products(
        after.total_assets,
        before.total_shares,
        before.total_assets,
        after.total_shares,
    ) != Ordering::Less
}

/// Utilization in 1e18 fixed point: `outstanding / max(total_assets, 1)`
pub fn utilization_wad(outstanding: u128, total_assets: u128) -> u128 {
    let denom = if total_assets == 0 { 1 } else { total_assets };
    wad_div(outstanding, denom).unwrap_or(u128::MAX)
}

/// Outstanding part of a loan balance, clipped at zero
pub fn outstanding_of(owed: u128, repaid: u128) -> u128 {
    sub_u128(owed, repaid)
}
