#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, xdr::ToXdr, Address,
    BytesN, Env, String, Symbol, Vec,
};


/// Longest token URI (base prefix plus per-token suffix) we will render.
const MAX_URI_LEN: usize = 256;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Contract has not been initialized
    NotInitialized = 201,
    /// Contract has already been initialized
    AlreadyInitialized = 202,
    /// Caller is not the marketplace this collection belongs to
    Unauthorized = 203,
    /// Minted id must equal the next sequential token id
    TokenIdMismatch = 204,
    /// The token URI was already consumed by an earlier mint
    TokenUriAlreadyExists = 205,
    /// Token with the given id does not exist
    NonExistentToken = 206,
    /// Caller is not the owner of the token
    NotOwner = 207,
    /// Joined base URI and suffix exceed the render buffer
    UriTooLong = 208,
}

#[contracttype]
pub enum DataKey {
    /// Marketplace address; sole authority for mint and metadata updates
    Marketplace,
    /// Collection display name
    Name,
    /// Collection display symbol
    Symbol,
    /// Next sequential token id / total minted
    NextTokenId,
    /// token_id -> owner
    Owner(u32),
    /// token_id -> URI suffix
    TokenUri(u32),
    /// sha256 of a consumed URI suffix -> true
    UriUsed(BytesN<32>),
}

const MINT: Symbol = symbol_short!("mint");
const BURN: Symbol = symbol_short!("burn");

#[contract]
pub struct TokenCollectionContract;

#[contractimpl]
impl TokenCollectionContract {
    /// Bind this collection to its marketplace and set display metadata.
    pub fn initialize(
        e: Env,
        marketplace: Address,
        name: String,
        symbol: String,
    ) -> Result<(), Error> {
        if e.storage().instance().has(&DataKey::Marketplace) {
            return Err(Error::AlreadyInitialized);
        }
        e.storage().instance().set(&DataKey::Marketplace, &marketplace);
        e.storage().instance().set(&DataKey::Name, &name);
        e.storage().instance().set(&DataKey::Symbol, &symbol);
        e.storage().instance().set(&DataKey::NextTokenId, &0u32);
        Ok(())
    }

    fn require_marketplace(e: &Env, caller: &Address) -> Result<(), Error> {
        caller.require_auth();
        let marketplace: Address = e
            .storage()
            .instance()
            .get(&DataKey::Marketplace)
            .ok_or(Error::NotInitialized)?;
        if *caller != marketplace {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    /// Mint `token_id` to `to` with the given URI suffix.
    ///
    /// Ids are strictly sequential and every URI suffix can be consumed at
    /// most once, so a settled purchase authorization can never be replayed
    /// into a second mint.
    pub fn mint(
        e: Env,
        caller: Address,
        to: Address,
        token_id: u32,
        token_uri: String,
    ) -> Result<(), Error> {
        Self::require_marketplace(&e, &caller)?;

        let next_id: u32 = e
            .storage()
            .instance()
            .get(&DataKey::NextTokenId)
            .ok_or(Error::NotInitialized)?;
        if token_id != next_id {
            return Err(Error::TokenIdMismatch);
        }

        let uri_hash: BytesN<32> = e.crypto().sha256(&token_uri.clone().to_xdr(&e)).into();
        if e.storage()
            .persistent()
            .get::<DataKey, bool>(&DataKey::UriUsed(uri_hash.clone()))
            .unwrap_or(false)
        {
            return Err(Error::TokenUriAlreadyExists);
        }

        e.storage().persistent().set(&DataKey::Owner(token_id), &to);
        e.storage()
            .persistent()
            .set(&DataKey::TokenUri(token_id), &token_uri);
        e.storage().persistent().set(&DataKey::UriUsed(uri_hash), &true);
        e.storage()
            .instance()
            .set(&DataKey::NextTokenId, &(next_id + 1));

        e.events().publish((MINT, token_id), (to, token_uri));
        Ok(())
    }

    /// Burn a token. Only its current owner may do so; the URI stays
    /// consumed, so the freed id and URI can never be re-minted.
    pub fn burn(e: Env, caller: Address, token_id: u32) -> Result<(), Error> {
        caller.require_auth();
        let owner: Address = e
            .storage()
            .persistent()
            .get(&DataKey::Owner(token_id))
            .ok_or(Error::NonExistentToken)?;
        if owner != caller {
            return Err(Error::NotOwner);
        }

        e.storage().persistent().remove(&DataKey::Owner(token_id));
        e.storage().persistent().remove(&DataKey::TokenUri(token_id));

        e.events().publish((BURN, token_id), caller);
        Ok(())
    }

    pub fn transfer(e: Env, from: Address, to: Address, token_id: u32) -> Result<(), Error> {
        from.require_auth();
        let owner: Address = e
            .storage()
            .persistent()
            .get(&DataKey::Owner(token_id))
            .ok_or(Error::NonExistentToken)?;
        if owner != from {
            return Err(Error::NotOwner);
        }

        e.storage().persistent().set(&DataKey::Owner(token_id), &to);

        e.events()
            .publish((symbol_short!("transfer"), token_id), (from, to));
        Ok(())
    }

    /// Replace the displayed name and symbol. Marketplace only.
    pub fn update_metadata(
        e: Env,
        caller: Address,
        name: String,
        symbol: String,
    ) -> Result<(), Error> {
        Self::require_marketplace(&e, &caller)?;
        e.storage().instance().set(&DataKey::Name, &name);
        e.storage().instance().set(&DataKey::Symbol, &symbol);
        Ok(())
    }

    pub fn owner_of(e: Env, token_id: u32) -> Result<Address, Error> {
        e.storage()
            .persistent()
            .get(&DataKey::Owner(token_id))
            .ok_or(Error::NonExistentToken)
    }

    /// Full URI of a token: the marketplace-wide base prefix joined with
    /// the suffix recorded at mint time.
    pub fn token_uri(e: Env, token_id: u32) -> Result<String, Error> {
        let suffix: String = e
            .storage()
            .persistent()
            .get(&DataKey::TokenUri(token_id))
            .ok_or(Error::NonExistentToken)?;

        let marketplace: Address = e
            .storage()
            .instance()
            .get(&DataKey::Marketplace)
            .ok_or(Error::NotInitialized)?;
        let base: String = e.invoke_contract(
            &marketplace,
            &Symbol::new(&e, "base_uri"),
            Vec::new(&e),
        );

        Self::join_uri(&e, &base, &suffix)
    }

    pub fn name(e: Env) -> Result<String, Error> {
        e.storage()
            .instance()
            .get(&DataKey::Name)
            .ok_or(Error::NotInitialized)
    }

    pub fn symbol(e: Env) -> Result<String, Error> {
        e.storage()
            .instance()
            .get(&DataKey::Symbol)
            .ok_or(Error::NotInitialized)
    }

    pub fn next_token_id(e: Env) -> u32 {
        e.storage()
            .instance()
            .get(&DataKey::NextTokenId)
            .unwrap_or(0)
    }

    pub fn get_marketplace(e: Env) -> Result<Address, Error> {
        e.storage()
            .instance()
            .get(&DataKey::Marketplace)
            .ok_or(Error::NotInitialized)
    }

    fn join_uri(e: &Env, base: &String, suffix: &String) -> Result<String, Error> {
        let base_len = base.len() as usize;
        let suffix_len = suffix.len() as usize;
        if base_len + suffix_len > MAX_URI_LEN {
            return Err(Error::UriTooLong);
        }

        let mut buf = [0u8; MAX_URI_LEN];
        if base_len > 0 {
            base.copy_into_slice(&mut buf[..base_len]);
        }
        if suffix_len > 0 {
            suffix.copy_into_slice(&mut buf[base_len..base_len + suffix_len]);
        }

        let joined = core::str::from_utf8(&buf[..base_len + suffix_len])
            .map_err(|_| Error::UriTooLong)?;
        Ok(String::from_str(e, joined))
    }
}
