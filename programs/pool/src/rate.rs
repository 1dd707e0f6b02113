//! Utilization-based interest-rate curve
//!
//! Maps pool utilization (1e18 = 100%) to a per-second borrow rate in 1e18
//! fixed point:
//!
//! ```text
//! annual(u) = base + slope * u                          u <= kink_utilization
//! annual(u) = base + slope * k + slope * kink * (u - k) u >  kink_utilization
//! per_second(u) = min(annual(u) / SECONDS_PER_YEAR, max_rate)
//! ```
//!
//! `base` and `slope` are annual percentages, `kink` multiplies the slope
//! past the kink. The default `(5, 5, 1)` is a straight line from 5% APR
//! idle to 10% APR fully utilized.

use model_safety::math::{add_u128, mul_div, u128_to_i128, SECONDS_PER_YEAR, WAD};
use serde::{Deserialize, Serialize};

/// 1% annual in 1e18 fixed point
const ONE_PERCENT: u128 = WAD / 100;

/// Rate curve parameters (owner configurable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Annual rate at zero utilization, in percent
    pub base: u32,
    /// Annual rate added from zero to full utilization, in percent
    pub slope: u32,
    /// Slope multiplier past `kink_utilization` (1 = no jump)
    pub kink: u32,
    /// Utilization where the slope multiplier starts (1e18 fixed point)
    pub kink_utilization: u64,
    /// Annual ceiling, in percent
    pub max_annual: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            base: 5,
            slope: 5,
            kink: 1,
            kink_utilization: 800_000_000_000_000_000, // 80%
            max_annual: 1_000,                         // 1000% APR ceiling
        }
    }
}

impl RateConfig {
    pub fn new(base: u32, slope: u32, kink: u32) -> Self {
        Self {
            base,
            slope,
            kink,
            ..Self::default()
        }
    }
}

/// Stateless curve evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateCurve {
    config: RateConfig,
}

impl RateCurve {
    pub fn new(config: RateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    /// Annual rate at `utilization`, 1e18 fixed point, before the ceiling
    fn raw_annual(&self, utilization: u128) -> u128 {
        let c = &self.config;
        let u = utilization.min(WAD);
        let k = (c.kink_utilization as u128).min(WAD);

        let base = (c.base as u128).saturating_mul(ONE_PERCENT);
        let slope = (c.slope as u128).saturating_mul(ONE_PERCENT);

        // Every product below is at most u32::MAX * 1e16 * 1e18 / 1e18
        let below = mul_div(slope, u.min(k), WAD).unwrap_or(u128::MAX);
        let above = if u > k {
            let steep = slope.saturating_mul(c.kink as u128);
            mul_div(steep, u - k, WAD).unwrap_or(u128::MAX)
        } else {
            0
        };

        add_u128(add_u128(base, below), above)
    }

    /// Annual rate at `utilization`, 1e18 fixed point, ceiling applied
    pub fn annual_rate(&self, utilization: u128) -> u128 {
        let cap = (self.config.max_annual as u128).saturating_mul(ONE_PERCENT);
        self.raw_annual(utilization).min(cap)
    }

    /// Per-second rate at `utilization`, 1e18 fixed point
    ///
    /// Monotonic non-decreasing in utilization; utilization above 100% is
    /// treated as 100%.
    pub fn per_second_rate(&self, utilization: u128) -> i128 {
        u128_to_i128(self.annual_rate(utilization) / SECONDS_PER_YEAR)
    }
}
