//! Pool health reporting

use model_safety::helpers::{assets_per_share_non_decreasing, PoolSnapshot};
use model_safety::math::WAD;
use strike_pool::LoanLedger;

/// Point-in-time view of pool accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    pub total_assets: u128,
    pub total_shares: u128,
    pub idle: u128,
    pub outstanding: u128,
    /// 1e18 = 100%
    pub utilization: u128,
    /// Assets per share, 1e18 fixed point
    pub share_price: u128,
    /// Per-second borrow rate, 1e18 fixed point
    pub rate_per_second: i128,
    pub loan_count: usize,
}

impl PoolReport {
    pub fn capture(pool: &LoanLedger) -> Self {
        Self {
            total_assets: pool.total_assets(),
            total_shares: pool.total_shares(),
            idle: pool.idle_assets(),
            outstanding: pool.outstanding(),
            utilization: pool.utilization(),
            share_price: pool.share_price(),
            rate_per_second: pool.current_rate(),
            loan_count: pool.loan_count(),
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot::new(self.total_assets, self.total_shares)
    }

    /// Utilization as a percentage, for display only
    pub fn utilization_pct(&self) -> f64 {
        self.utilization as f64 * 100.0 / WAD as f64
    }

    pub fn is_stressed(&self, alert: u128) -> bool {
        self.utilization >= alert
    }

    /// Share price fell since `previous` without a matching withdrawal
    pub fn leaked_since(&self, previous: &PoolReport) -> bool {
        !assets_per_share_non_decreasing(&previous.snapshot(), &self.snapshot())
    }

    pub fn log(&self, alert: u128) {
        log::info!(
            "pool: assets {} shares {} idle {} outstanding {} loans {} utilization {:.2}% share price {:.6}",
            self.total_assets,
            self.total_shares,
            self.idle,
            self.outstanding,
            self.loan_count,
            self.utilization_pct(),
            self.share_price as f64 / WAD as f64
        );
        if self.is_stressed(alert) {
            log::warn!(
                "pool utilization {:.2}% above alert level, rate {} per second",
                self.utilization_pct(),
                self.rate_per_second
            );
        }
    }
}
