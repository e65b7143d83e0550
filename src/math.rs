//! Checked fixed-point arithmetic over the pool's 10^9 price scale.
//!
//! Every price and fee rate in the engine is an unsigned 64-bit fixed-point
//! value with scale [`FLOAT_SCALING`]. All products go through `u128`
//! intermediates and every narrowing conversion is checked; the engine aborts
//! the enclosing operation instead of wrapping.

use crate::error::DexError;
use static_assertions::const_assert;
use static_assertions::const_assert_eq;

/// Fixed-point scale shared by prices and fee rates.
pub const FLOAT_SCALING: u64 = 1_000_000_000;

const FLOAT_SCALING_U128: u128 = FLOAT_SCALING as u128;

const_assert!(FLOAT_SCALING > 0);
const_assert_eq!(FLOAT_SCALING_U128, FLOAT_SCALING as u128);

/// `floor(x * y / FLOAT_SCALING)`.
///
/// The product is exact in `u128`; only the narrowing back to `u64` can fail.
#[inline(always)]
pub fn mul_floor(x: u64, y: u64) -> Result<u64, DexError> {
    let result = x as u128 * y as u128 / FLOAT_SCALING_U128;
    u64::try_from(result).map_err(|_| DexError::Arithmetic)
}

/// `ceil(x * y / FLOAT_SCALING)`.
#[inline(always)]
pub fn mul_ceil(x: u64, y: u64) -> Result<u64, DexError> {
    let numerator = x as u128 * y as u128;
    let result = (numerator + FLOAT_SCALING_U128 - 1) / FLOAT_SCALING_U128;
    u64::try_from(result).map_err(|_| DexError::Arithmetic)
}

/// `floor(x * FLOAT_SCALING / y)`. Used to convert a quote budget back into
/// base units at a given price.
#[inline(always)]
pub fn div_floor(x: u64, y: u64) -> Result<u64, DexError> {
    if y == 0 {
        return Err(DexError::Arithmetic);
    }
    let result = x as u128 * FLOAT_SCALING_U128 / y as u128;
    u64::try_from(result).map_err(|_| DexError::Arithmetic)
}

/// Largest quote notional that can be spent out of `budget` such that the
/// aggregate taker fee charged on top still fits inside `budget`.
///
/// The desired result is `budget / (1 + fee_rate)`. Computed as
/// `budget * FLOAT_SCALING / (FLOAT_SCALING + fee_rate)` in `u128`; with
/// `fee_rate < FLOAT_SCALING` the denominator never overflows.
#[inline(always)]
pub fn fee_adjusted_budget(budget: u64, fee_rate: u64) -> Result<u64, DexError> {
    let denominator = FLOAT_SCALING_U128 + fee_rate as u128;
    let result = budget as u128 * FLOAT_SCALING_U128 / denominator;
    u64::try_from(result).map_err(|_| DexError::Arithmetic)
}

/// Checked addition surfaced as an engine error.
#[inline(always)]
pub fn checked_add(x: u64, y: u64) -> Result<u64, DexError> {
    x.checked_add(y).ok_or(DexError::Arithmetic)
}

/// Checked subtraction surfaced as an engine error.
#[inline(always)]
pub fn checked_sub(x: u64, y: u64) -> Result<u64, DexError> {
    x.checked_sub(y).ok_or(DexError::Arithmetic)
}

/// Rounds `quantity` down to a multiple of `lot_size`.
#[inline(always)]
pub fn round_down_to_lot(quantity: u64, lot_size: u64) -> u64 {
    quantity - quantity % lot_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_floor_truncates() {
        // 3 * 1.5 = 4.5 -> 4
        assert_eq!(mul_floor(3, 1_500_000_000).unwrap(), 4);
        assert_eq!(mul_ceil(3, 1_500_000_000).unwrap(), 5);
    }

    #[test]
    fn mul_exact_is_identical_for_floor_and_ceil() {
        let price = 5 * FLOAT_SCALING;
        assert_eq!(mul_floor(600, price).unwrap(), 3000);
        assert_eq!(mul_ceil(600, price).unwrap(), 3000);
    }

    #[test]
    fn mul_uses_wide_intermediates() {
        // u64 * u64 products above 2^64 must not wrap.
        let price = u32::MAX as u64 * FLOAT_SCALING;
        assert_eq!(mul_floor(u32::MAX as u64, price).unwrap(), (u32::MAX as u64).pow(2));
    }

    #[test]
    fn mul_overflow_is_an_error() {
        assert_eq!(mul_floor(u64::MAX, u64::MAX), Err(DexError::Arithmetic));
    }

    #[test]
    fn div_floor_inverts_mul() {
        let price = 2 * FLOAT_SCALING;
        // 4500 quote at price 2 buys 2250 base
        assert_eq!(div_floor(4500, price).unwrap(), 2250);
        assert_eq!(div_floor(1, 0), Err(DexError::Arithmetic));
    }

    #[test]
    fn fee_adjusted_budget_always_covers_the_fee() {
        let fee_rate = 5_000_000; // 0.5%
        for budget in [0u64, 1, 200, 3015, 4523, 1_000_000_000_000] {
            let notional = fee_adjusted_budget(budget, fee_rate).unwrap();
            let fee = mul_floor(notional, fee_rate).unwrap();
            assert!(notional + fee <= budget, "budget {} overspent", budget);
        }
    }

    #[test]
    fn lot_rounding() {
        assert_eq!(round_down_to_lot(1005, 10), 1000);
        assert_eq!(round_down_to_lot(9, 10), 0);
        assert_eq!(round_down_to_lot(1000, 10), 1000);
    }
}
