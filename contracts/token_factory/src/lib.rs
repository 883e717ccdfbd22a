#![no_std]
use shared_utils::Pagination;
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, xdr::ToXdr, Address,
    BytesN, Env, IntoVal, String, Symbol, Vec,
};


#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Contract has not been initialized
    NotInitialized = 301,
    /// Contract has already been initialized
    AlreadyInitialized = 302,
    /// Caller is not authorized to perform this action
    Unauthorized = 303,
    /// Collection wasm hash has not been uploaded and registered yet
    WasmHashNotSet = 304,
}

#[contracttype]
pub enum DataKey {
    /// Admin address (singleton)
    Admin,
    /// Marketplace allowed to request deployments
    Marketplace,
    /// Wasm hash of the token collection contract
    CollectionWasm,
    /// Deployed collection addresses, in deployment order
    Collections,
    /// address -> true for every collection this factory deployed
    IsCollection(Address),
    /// Salt counter for deterministic deployments
    DeployCounter,
}

#[contract]
pub struct TokenFactoryContract;

#[contractimpl]
impl TokenFactoryContract {
    pub fn initialize(e: Env, admin: Address, marketplace: Address) -> Result<(), Error> {
        if e.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        e.storage().instance().set(&DataKey::Admin, &admin);
        e.storage().instance().set(&DataKey::Marketplace, &marketplace);
        e.storage()
            .instance()
            .set(&DataKey::Collections, &Vec::<Address>::new(&e));
        e.storage().instance().set(&DataKey::DeployCounter, &0u64);
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

    /// Register the wasm hash the factory instantiates collections from.
    pub fn set_collection_wasm(e: Env, caller: Address, wasm_hash: BytesN<32>) -> Result<(), Error> {
        Self::require_admin(&e, &caller)?;
        e.storage().instance().set(&DataKey::CollectionWasm, &wasm_hash);
        e.events().publish((symbol_short!("wasm_set"),), wasm_hash);
        Ok(())
    }

    /// Point the factory at a new marketplace instance.
    pub fn set_marketplace(e: Env, caller: Address, marketplace: Address) -> Result<(), Error> {
        Self::require_admin(&e, &caller)?;
        e.storage().instance().set(&DataKey::Marketplace, &marketplace);
        Ok(())
    }

    /// Deploy a fresh collection instance bound to the calling marketplace.
    ///
    /// The salt is derived from a monotonic counter, so every deployment
    /// lands on a distinct deterministic address.
    pub fn deploy_collection(
        e: Env,
        caller: Address,
        name: String,
        symbol: String,
    ) -> Result<Address, Error> {
        caller.require_auth();
        let marketplace: Address = e
            .storage()
            .instance()
            .get(&DataKey::Marketplace)
            .ok_or(Error::NotInitialized)?;
        if caller != marketplace {
            return Err(Error::Unauthorized);
        }

        let wasm_hash: BytesN<32> = e
            .storage()
            .instance()
            .get(&DataKey::CollectionWasm)
            .ok_or(Error::WasmHashNotSet)?;

        let counter: u64 = e
            .storage()
            .instance()
            .get(&DataKey::DeployCounter)
            .unwrap_or(0);
        let salt: BytesN<32> = e.crypto().sha256(&counter.to_xdr(&e)).into();

        let deployed = e
            .deployer()
            .with_current_contract(salt)
            .deploy(wasm_hash);

        let mut init_args = Vec::new(&e);
        init_args.push_back(marketplace.into_val(&e));
        init_args.push_back(name.into_val(&e));
        init_args.push_back(symbol.into_val(&e));
        e.invoke_contract::<()>(&deployed, &Symbol::new(&e, "initialize"), init_args);

        let mut collections: Vec<Address> = e
            .storage()
            .instance()
            .get(&DataKey::Collections)
            .unwrap_or(Vec::new(&e));
        collections.push_back(deployed.clone());
        e.storage().instance().set(&DataKey::Collections, &collections);
        e.storage()
            .instance()
            .set(&DataKey::IsCollection(deployed.clone()), &true);
        e.storage()
            .instance()
            .set(&DataKey::DeployCounter, &(counter + 1));

        e.events()
            .publish((symbol_short!("deployed"),), deployed.clone());
        Ok(deployed)
    }

    pub fn is_collection(e: Env, address: Address) -> bool {
        e.storage()
            .instance()
            .get(&DataKey::IsCollection(address))
            .unwrap_or(false)
    }

    pub fn get_collections_count(e: Env) -> u32 {
        e.storage()
            .instance()
            .get::<_, Vec<Address>>(&DataKey::Collections)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub fn get_collections(e: Env, offset: u32, limit: u32) -> Vec<Address> {
        let collections: Vec<Address> = e
            .storage()
            .instance()
            .get(&DataKey::Collections)
            .unwrap_or(Vec::new(&e));
        Pagination::slice(&e, &collections, offset, limit)
    }

    pub fn get_admin(e: Env) -> Result<Address, Error> {
        e.storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)
    }
}
