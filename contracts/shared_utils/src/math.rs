//! Checked fixed-point math helpers.
//!
//! All prices are 18-decimal fixed-point values and all percentages use
//! `PERCENTAGE_100` as the 100% base, so fractions survive integer division.
//! Intermediate products are widened through the host's 256-bit integers;
//! a `PERCENTAGE_100`-scaled product does not fit in an `i128`.

use soroban_sdk::{Env, I256};

/// One whole unit in 18-decimal fixed-point.
pub const DECIMAL: i128 = 1_000_000_000_000_000_000;

/// 100% in fixed-point percentage units (10^27).
pub const PERCENTAGE_100: i128 = DECIMAL * 1_000_000_000;

pub struct SafeMath;

impl SafeMath {
    /// `a * b / denom` with floor division.
    ///
    /// Returns `None` for a zero denominator or a quotient outside `i128`.
    pub fn mul_div(e: &Env, a: i128, b: i128, denom: i128) -> Option<i128> {
        if denom == 0 {
            return None;
        }
        I256::from_i128(e, a)
            .mul(&I256::from_i128(e, b))
            .div(&I256::from_i128(e, denom))
            .to_i128()
    }

    /// Applies a fixed-point discount to `amount`.
    ///
    /// `None` when the discount is outside `[0, PERCENTAGE_100)` or the
    /// discounted amount does not fit in an `i128`.
    pub fn apply_discount(e: &Env, amount: i128, discount: i128) -> Option<i128> {
        if discount < 0 || discount >= PERCENTAGE_100 {
            return None;
        }
        Self::mul_div(e, amount, PERCENTAGE_100 - discount, PERCENTAGE_100)
    }
}
