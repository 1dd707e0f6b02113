//! Total fixed-point arithmetic - no unwrap, no panics, no lossy casts
//!
//! Every ledger quantity in the engine is a `u128`. Products such as
//! `principal * rate * elapsed` or `amount * total_shares` can exceed 128
//! bits, so the division helpers here carry a full 256-bit intermediate.

/// 1.0 in 1e18 fixed point
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator (10_000 = 100%)
pub const BPS: u128 = 10_000;

/// 365 days, used to turn annual rates into per-second rates
pub const SECONDS_PER_YEAR: u128 = 31_536_000;

/// Add u128 with saturation at MAX
pub fn add_u128(a: u128, b: u128) -> u128 {
    a.saturating_add(b)
}

/// Subtract u128 with saturation at 0
pub fn sub_u128(a: u128, b: u128) -> u128 {
    a.saturating_sub(b)
}

/// Clamp i128 to u128 (negative becomes 0)
pub fn clamp_pos_i128(x: i128) -> u128 {
    if x > 0 {
        x.unsigned_abs()
    } else {
        0
    }
}

/// Convert u128 to i128 with saturation at i128::MAX
pub fn u128_to_i128(x: u128) -> i128 {
    i128::try_from(x).unwrap_or(i128::MAX)
}

/// Full 256-bit product of two u128 values as `(hi, lo)`
pub fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;

    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Middle column: each term < 2^128, sum of three 64-bit halves fits
    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);

    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);

    (hi, lo)
}

/// Divide the 256-bit value `(hi, lo)` by `d`
///
/// Returns `None` on division by zero or when the quotient does not fit
/// in 128 bits.
pub fn div_wide(hi: u128, lo: u128, d: u128) -> Option<u128> {
    if d == 0 || hi >= d {
        return None;
    }
    if hi == 0 {
        return Some(lo / d);
    }

    // Restoring long division, one quotient bit per step. `rem < d` holds
    // at the top of every iteration, so the shifted value needs 129 bits at
    // most: the carry flag is the 129th bit.
    let mut rem = hi;
    let mut quot = 0u128;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1u128 << i;
        }
    }
    Some(quot)
}

/// `floor(a * b / d)` with a 256-bit intermediate
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    let (hi, lo) = mul_wide(a, b);
    div_wide(hi, lo, d)
}

/// `floor(a * WAD / b)`
pub fn wad_div(a: u128, b: u128) -> Option<u128> {
    mul_div(a, WAD, b)
}

/// `floor(amount * bps / 10_000)`
pub fn bps_of(amount: u128, bps: u16) -> u128 {
    // bps <= u16::MAX, so the quotient is at most 6.5x amount and the
    // 256-bit path only fails for amounts near u128::MAX
    mul_div(amount, bps as u128, BPS).unwrap_or(u128::MAX)
}

/// Compare `a * b` against `c * d` without overflow
pub fn cmp_products(a: u128, b: u128, c: u128, d: u128) -> core::cmp::Ordering {
    mul_wide(a, b).cmp(&mul_wide(c, d))
}
