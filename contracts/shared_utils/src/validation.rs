//! Input validation predicates.

use soroban_sdk::String;

use crate::math::PERCENTAGE_100;

pub struct Validation;

impl Validation {
    pub fn non_empty(s: &String) -> bool {
        s.len() > 0
    }

    pub fn is_non_negative(value: i128) -> bool {
        value >= 0
    }

    /// A discount is a fraction of `PERCENTAGE_100`; exactly 100% (a free
    /// mint) is rejected.
    pub fn is_valid_discount(discount: i128) -> bool {
        (0..PERCENTAGE_100).contains(&discount)
    }
}
