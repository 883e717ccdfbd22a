#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, Address, BytesN, Env,
    Symbol,
};


/// Role held by addresses allowed to mutate the marketplace catalogue.
pub const MARKETPLACE_MANAGER: Symbol = symbol_short!("MP_MGR");
/// Role held by addresses allowed to withdraw accrued proceeds.
pub const WITHDRAWAL_MANAGER: Symbol = symbol_short!("WD_MGR");

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Contract has not been initialized
    NotInitialized = 101,
    /// Contract has already been initialized
    AlreadyInitialized = 102,
    /// Caller is not authorized to perform this action
    Unauthorized = 103,
}

#[contracttype]
pub enum DataKey {
    /// Admin address (singleton)
    Admin,
    /// Role membership (role, address) -> bool
    Role(Symbol, Address),
    /// Authorized quote-signer public keys (uncompressed SEC1, 65 bytes)
    SignerKey(BytesN<65>),
}

#[contract]
pub struct RoleManagerContract;

#[contractimpl]
impl RoleManagerContract {
    pub fn initialize(e: Env, admin: Address) -> Result<(), Error> {
        if e.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        e.storage().instance().set(&DataKey::Admin, &admin);
        Ok(())
    }

    fn require_admin(e: &Env, caller: &Address) -> Result<(), Error> {
        caller.require_auth();
        let admin: Address = e
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)?;
        if *caller != admin {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    pub fn grant_role(e: Env, caller: Address, role: Symbol, account: Address) -> Result<(), Error> {
        Self::require_admin(&e, &caller)?;
        e.storage()
            .persistent()
            .set(&DataKey::Role(role.clone(), account.clone()), &true);
        e.events()
            .publish((symbol_short!("granted"), role), account);
        Ok(())
    }

    pub fn revoke_role(
        e: Env,
        caller: Address,
        role: Symbol,
        account: Address,
    ) -> Result<(), Error> {
        Self::require_admin(&e, &caller)?;
        e.storage()
            .persistent()
            .remove(&DataKey::Role(role.clone(), account.clone()));
        e.events()
            .publish((symbol_short!("revoked"), role), account);
        Ok(())
    }

    pub fn has_role(e: Env, role: Symbol, account: Address) -> bool {
        e.storage()
            .persistent()
            .get(&DataKey::Role(role, account))
            .unwrap_or(false)
    }

    pub fn is_marketplace_manager(e: Env, account: Address) -> bool {
        Self::has_role(e, MARKETPLACE_MANAGER, account)
    }

    pub fn is_withdrawal_manager(e: Env, account: Address) -> bool {
        Self::has_role(e, WITHDRAWAL_MANAGER, account)
    }

    /// Register a quote-signer public key.
    ///
    /// Purchase authorizations must recover to one of these keys.
    pub fn add_signer_key(e: Env, caller: Address, key: BytesN<65>) -> Result<(), Error> {
        Self::require_admin(&e, &caller)?;
        e.storage()
            .persistent()
            .set(&DataKey::SignerKey(key.clone()), &true);
        e.events().publish((symbol_short!("sig_add"),), key);
        Ok(())
    }

    pub fn remove_signer_key(e: Env, caller: Address, key: BytesN<65>) -> Result<(), Error> {
        Self::require_admin(&e, &caller)?;
        e.storage().persistent().remove(&DataKey::SignerKey(key.clone()));
        e.events().publish((symbol_short!("sig_rm"),), key);
        Ok(())
    }

    pub fn is_signature_authority(e: Env, key: BytesN<65>) -> bool {
        e.storage()
            .persistent()
            .get(&DataKey::SignerKey(key))
            .unwrap_or(false)
    }

    pub fn get_admin(e: Env) -> Result<Address, Error> {
        e.storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)
    }
}
