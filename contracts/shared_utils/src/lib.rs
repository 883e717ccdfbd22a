#![no_std]

//! Shared utility library for the marketplace contracts
//!
//! Provides the common building blocks used across the workspace:
//! - Fixed-point math with checked arithmetic
//! - Pausable gate
//! - Input validation helpers
//! - Offset/limit pagination over Soroban vectors

pub mod math;
pub mod pagination;
pub mod pausable;
pub mod validation;


pub use math::{SafeMath, DECIMAL, PERCENTAGE_100};
pub use pagination::Pagination;
pub use pausable::Pausable;
pub use validation::Validation;
