//! Pausable gate shared by the contracts.
//!
//! The flag lives in instance storage under `PAUSED_KEY`; callers decide
//! which entry points consult it.

use soroban_sdk::{symbol_short, Env, Symbol};

pub struct Pausable;

impl Pausable {
    pub const PAUSED_KEY: Symbol = symbol_short!("PAUSED");

    pub fn is_paused(e: &Env) -> bool {
        e.storage()
            .instance()
            .get(&Self::PAUSED_KEY)
            .unwrap_or(false)
    }

    pub fn pause(e: &Env) {
        e.storage().instance().set(&Self::PAUSED_KEY, &true);
    }

    pub fn unpause(e: &Env) {
        e.storage().instance().set(&Self::PAUSED_KEY, &false);
    }
}
