#![no_std]

//! Marketplace settlement engine.
//!
//! Sells collectible tokens against off-chain signed price quotes. A quote
//! binds the network, this contract, the target collection, the future token
//! id and the payment terms; settlement verifies the quote, moves value
//! through exactly one of the four payment lanes (native asset, fungible
//! token, voucher, NFT collateral) and mints the purchased token once.

use shared_utils::{Pagination, Pausable, SafeMath, Validation, DECIMAL};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, crypto::Hash, symbol_short, token,
    xdr::ToXdr, Address, Bytes, BytesN, Env, IntoVal, String, Symbol, Vec,
};


/// Domain tags keep the two quote layouts from being replayed across lanes.
const CURRENCY_QUOTE_TAG: &[u8] = b"marketplace-buy-v1";
const NFT_QUOTE_TAG: &[u8] = b"marketplace-buy-nft-v1";

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Contract has not been initialized
    NotInitialized = 1,
    /// Contract has already been initialized
    AlreadyInitialized = 2,
    /// Caller lacks the role required for this operation
    Unauthorized = 3,
    /// Contract is paused
    ContractPaused = 4,
    /// Listing name or symbol is empty
    EmptyMetadata = 5,
    /// A listing can never start out disabled
    DisabledOnCreation = 6,
    /// The token contract is not part of the catalogue
    TokenNotRegistered = 7,
    /// The listing is disabled and accepts no new mints
    TokenIsDisabled = 8,
    /// Discount must be in [0, 100%)
    InvalidDiscount = 9,
    /// The quote's end timestamp has passed
    SignatureExpired = 10,
    /// The quote does not recover to an authorized signer
    InvalidSignature = 11,
    /// Attached native currency does not cover the owed amount
    InsufficientCurrency = 12,
    /// This payment lane requires zero attached native currency
    NonZeroCurrency = 13,
    /// The listing has no voucher token configured
    VoucherNotConfigured = 14,
    /// The listing cannot be purchased with an NFT
    NftNotBuyable = 15,
    /// Offered NFT floor price is below the listing minimum
    FloorPriceTooLow = 16,
    /// Caller does not own the presented NFT
    NotNftOwner = 17,
    /// The engine holds no balance of the requested token
    NothingToWithdraw = 18,
    /// Arithmetic overflow while computing the owed amount
    MathOverflow = 19,
    /// Purchase entry points cannot be re-entered
    ReentrancyDetected = 20,
    /// Price and amount parameters must be non-negative
    InvalidAmount = 21,
}

// ─── Data model ───────────────────────────────────────────────────────────────

/// Economic parameters of a listed collection.
///
/// The optional fields double as switches: `voucher_token_contract = None`
/// disables the voucher lane and `funds_recipient = None` keeps proceeds in
/// the engine until withdrawn.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenParams {
    pub price_per_one_token: i128,
    pub min_nft_floor_price: i128,
    pub voucher_tokens_amount: i128,
    pub voucher_token_contract: Option<Address>,
    pub funds_recipient: Option<Address>,
    pub is_nft_buyable: bool,
    pub is_disabled: bool,
}

/// The signed part of a purchase authorization common to both entry points.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuyRequest {
    pub token_contract: Address,
    pub future_token_id: u32,
    pub discount: i128,
    pub end_timestamp: u64,
    pub token_uri: String,
}

/// Caller-side payment terms for the currency / fungible / voucher lanes.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaymentDetails {
    pub payment_token: Address,
    pub payment_token_price: i128,
    pub attached_currency: i128,
}

/// The NFT presented as collateral on the NFT lane.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NftPayment {
    pub nft_contract: Address,
    pub nft_token_id: u32,
    pub nft_floor_price: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintedTokenInfo {
    pub token_id: u32,
    pub minted_token_price: i128,
    pub token_uri: String,
}

/// Catalogue row for the compact paginated view.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BaseTokenParams {
    pub token_contract: Address,
    pub price_per_one_token: i128,
    pub token_name: String,
}

/// Catalogue row for the full paginated view.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DetailedTokenParams {
    pub token_contract: Address,
    pub token_params: TokenParams,
    pub token_name: String,
    pub token_symbol: String,
}

// ─── Events ───────────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenContractDeployedEvent {
    pub token_contract: Address,
    pub token_name: String,
    pub token_symbol: String,
    pub token_params: TokenParams,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenContractParamsUpdatedEvent {
    pub token_contract: Address,
    pub token_name: String,
    pub token_symbol: String,
    pub token_params: TokenParams,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuccessfullyMintedEvent {
    pub recipient: Address,
    pub minted_token_info: MintedTokenInfo,
    pub payment_token: Address,
    pub paid_tokens: i128,
    pub payment_token_price: i128,
    pub discount: i128,
    pub funds_recipient: Option<Address>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuccessfullyMintedByNftEvent {
    pub recipient: Address,
    pub minted_token_info: MintedTokenInfo,
    pub nft_contract: Address,
    pub nft_token_id: u32,
    pub nft_floor_price: i128,
    pub funds_recipient: Option<Address>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaidTokensWithdrawnEvent {
    pub token: Address,
    pub recipient: Address,
    pub amount: i128,
}

// ─── Storage ──────────────────────────────────────────────────────────────────

#[contracttype]
pub enum DataKey {
    /// Identity allowed to rebind collaborator addresses
    Injector,
    /// Access control provider
    RoleManager,
    /// Collection deployer/registry
    TokenFactory,
    /// Stellar Asset Contract of the native currency
    NativeToken,
    /// URI prefix shared by all collections
    BaseUri,
    /// Full catalogue, insertion order
    TokenContracts,
    /// Catalogue minus disabled listings
    ActiveTokenContracts,
    /// token contract -> economic parameters
    TokenParams(Address),
    /// Purchase entry points may not be re-entered
    ReentrancyGuard,
}

// ─── Quote digests ────────────────────────────────────────────────────────────

/// Digest signed off-chain for the currency / fungible / voucher lanes.
///
/// Kept as a free function so tests and off-chain tooling can reproduce the
/// exact payload the contract verifies.
pub fn currency_quote_digest(
    e: &Env,
    marketplace: &Address,
    request: &BuyRequest,
    payment_token: &Address,
    payment_token_price: i128,
) -> Hash<32> {
    let mut payload = Bytes::from_slice(e, CURRENCY_QUOTE_TAG);
    append_domain(e, &mut payload, marketplace);
    append_request(e, &mut payload, request);
    payload.append(&payment_token.clone().to_xdr(e));
    payload.append(&payment_token_price.to_xdr(e));
    e.crypto().sha256(&payload)
}

/// Digest signed off-chain for the NFT-collateral lane. Binds the presented
/// NFT's contract, id and asserted floor price so a quote cannot be replayed
/// against different collateral.
pub fn nft_quote_digest(
    e: &Env,
    marketplace: &Address,
    request: &BuyRequest,
    nft: &NftPayment,
) -> Hash<32> {
    let mut payload = Bytes::from_slice(e, NFT_QUOTE_TAG);
    append_domain(e, &mut payload, marketplace);
    append_request(e, &mut payload, request);
    payload.append(&nft.nft_contract.clone().to_xdr(e));
    payload.append(&nft.nft_token_id.to_xdr(e));
    payload.append(&nft.nft_floor_price.to_xdr(e));
    e.crypto().sha256(&payload)
}

fn append_domain(e: &Env, payload: &mut Bytes, marketplace: &Address) {
    payload.append(&e.ledger().network_id().to_xdr(e));
    payload.append(&marketplace.clone().to_xdr(e));
}

fn append_request(e: &Env, payload: &mut Bytes, request: &BuyRequest) {
    payload.append(&request.token_contract.clone().to_xdr(e));
    payload.append(&request.future_token_id.to_xdr(e));
    payload.append(&request.discount.to_xdr(e));
    payload.append(&request.end_timestamp.to_xdr(e));
    payload.append(&request.token_uri.clone().to_xdr(e));
}

// ─── Storage and collaborator helpers ─────────────────────────────────────────

fn get_address(e: &Env, key: &DataKey) -> Result<Address, Error> {
    e.storage().instance().get(key).ok_or(Error::NotInitialized)
}

fn read_params(e: &Env, token_contract: &Address) -> Result<TokenParams, Error> {
    e.storage()
        .persistent()
        .get(&DataKey::TokenParams(token_contract.clone()))
        .ok_or(Error::TokenNotRegistered)
}

fn write_params(e: &Env, token_contract: &Address, params: &TokenParams) {
    e.storage()
        .persistent()
        .set(&DataKey::TokenParams(token_contract.clone()), params);
}

fn read_list(e: &Env, key: &DataKey) -> Vec<Address> {
    e.storage().instance().get(key).unwrap_or(Vec::new(e))
}

fn check_role(e: &Env, role_manager: &Address, query: &str, account: &Address) -> bool {
    let mut args = Vec::new(e);
    args.push_back(account.clone().into_val(e));
    e.invoke_contract(role_manager, &Symbol::new(e, query), args)
}

fn require_marketplace_manager(e: &Env, caller: &Address) -> Result<(), Error> {
    caller.require_auth();
    let role_manager = get_address(e, &DataKey::RoleManager)?;
    if !check_role(e, &role_manager, "is_marketplace_manager", caller) {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

fn require_withdrawal_manager(e: &Env, caller: &Address) -> Result<(), Error> {
    caller.require_auth();
    let role_manager = get_address(e, &DataKey::RoleManager)?;
    if !check_role(e, &role_manager, "is_withdrawal_manager", caller) {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

fn ensure_not_paused(e: &Env) -> Result<(), Error> {
    if Pausable::is_paused(e) {
        return Err(Error::ContractPaused);
    }
    Ok(())
}

fn require_no_reentrancy(e: &Env) -> Result<(), Error> {
    let guard: bool = e
        .storage()
        .instance()
        .get(&DataKey::ReentrancyGuard)
        .unwrap_or(false);
    if guard {
        return Err(Error::ReentrancyDetected);
    }
    Ok(())
}

fn set_reentrancy_guard(e: &Env, value: bool) {
    e.storage().instance().set(&DataKey::ReentrancyGuard, &value);
}

/// Verify a quote signature: expiry first (the two failures are distinct),
/// then recover the signer and check it against the signature-authority set.
fn verify_quote(
    e: &Env,
    digest: &Hash<32>,
    end_timestamp: u64,
    signature: &BytesN<64>,
    recovery_id: u32,
) -> Result<(), Error> {
    if end_timestamp < e.ledger().timestamp() {
        return Err(Error::SignatureExpired);
    }
    // x-overflow recovery ids are never produced by well-formed signers
    if recovery_id > 1 {
        return Err(Error::InvalidSignature);
    }

    let recovered = e.crypto().secp256k1_recover(digest, signature, recovery_id);

    let role_manager = get_address(e, &DataKey::RoleManager)?;
    let mut args = Vec::new(e);
    args.push_back(recovered.into_val(e));
    let authorized: bool =
        e.invoke_contract(&role_manager, &Symbol::new(e, "is_signature_authority"), args);
    if !authorized {
        return Err(Error::InvalidSignature);
    }
    Ok(())
}

/// `price_per_one_token` converted into payment-token units, discounted.
fn compute_owed(
    e: &Env,
    price_per_one_token: i128,
    payment_token_price: i128,
    discount: i128,
) -> Result<i128, Error> {
    let owed = SafeMath::mul_div(e, price_per_one_token, DECIMAL, payment_token_price)
        .ok_or(Error::MathOverflow)?;
    SafeMath::apply_discount(e, owed, discount).ok_or(Error::MathOverflow)
}

/// Pull `amount` of `payment_token` from the payer and route it to the
/// configured recipient, or keep it in the engine when the listing retains
/// proceeds.
fn pull_and_route(
    e: &Env,
    payment_token: &Address,
    payer: &Address,
    funds_recipient: &Option<Address>,
    amount: i128,
) {
    let this = e.current_contract_address();
    let client = token::Client::new(e, payment_token);
    match funds_recipient {
        Some(recipient) if *recipient != this => client.transfer(payer, recipient, &amount),
        _ => client.transfer(payer, &this, &amount),
    }
}

fn mint_purchased_token(e: &Env, token_contract: &Address, to: &Address, token_id: u32, token_uri: &String) {
    let this = e.current_contract_address();
    let mut args = Vec::new(e);
    args.push_back(this.into_val(e));
    args.push_back(to.clone().into_val(e));
    args.push_back(token_id.into_val(e));
    args.push_back(token_uri.clone().into_val(e));
    e.invoke_contract::<()>(token_contract, &Symbol::new(e, "mint"), args);
}

fn collection_string(e: &Env, token_contract: &Address, getter: &str) -> String {
    e.invoke_contract(token_contract, &Symbol::new(e, getter), Vec::new(e))
}

fn validate_params(params: &TokenParams) -> Result<(), Error> {
    if !Validation::is_non_negative(params.price_per_one_token)
        || !Validation::is_non_negative(params.min_nft_floor_price)
        || !Validation::is_non_negative(params.voucher_tokens_amount)
    {
        return Err(Error::InvalidAmount);
    }
    Ok(())
}

// ─── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct MarketplaceContract;

#[contractimpl]
impl MarketplaceContract {
    /// Wire the engine to its collaborators.
    ///
    /// `injector` is the only identity later allowed to rebind the role
    /// manager and factory; `native_token` is the Stellar Asset Contract the
    /// currency lane settles in.
    pub fn initialize(
        e: Env,
        injector: Address,
        role_manager: Address,
        token_factory: Address,
        native_token: Address,
        base_uri: String,
    ) -> Result<(), Error> {
        if e.storage().instance().has(&DataKey::Injector) {
            return Err(Error::AlreadyInitialized);
        }
        e.storage().instance().set(&DataKey::Injector, &injector);
        e.storage().instance().set(&DataKey::RoleManager, &role_manager);
        e.storage().instance().set(&DataKey::TokenFactory, &token_factory);
        e.storage().instance().set(&DataKey::NativeToken, &native_token);
        e.storage().instance().set(&DataKey::BaseUri, &base_uri);
        e.storage()
            .instance()
            .set(&DataKey::TokenContracts, &Vec::<Address>::new(&e));
        e.storage()
            .instance()
            .set(&DataKey::ActiveTokenContracts, &Vec::<Address>::new(&e));
        e.storage().instance().set(&Pausable::PAUSED_KEY, &false);
        Ok(())
    }

    /// Rebind collaborator addresses. Injector only.
    pub fn set_dependencies(
        e: Env,
        caller: Address,
        role_manager: Address,
        token_factory: Address,
    ) -> Result<(), Error> {
        caller.require_auth();
        let injector = get_address(&e, &DataKey::Injector)?;
        if caller != injector {
            return Err(Error::Unauthorized);
        }
        e.storage().instance().set(&DataKey::RoleManager, &role_manager);
        e.storage().instance().set(&DataKey::TokenFactory, &token_factory);
        e.events().publish(
            (symbol_short!("deps_set"),),
            (role_manager, token_factory),
        );
        Ok(())
    }

    // ── Pause control ────────────────────────────────────────────────────

    pub fn pause(e: Env, caller: Address) -> Result<(), Error> {
        require_marketplace_manager(&e, &caller)?;
        Pausable::pause(&e);
        e.events().publish((symbol_short!("paused"),), caller);
        Ok(())
    }

    pub fn unpause(e: Env, caller: Address) -> Result<(), Error> {
        require_marketplace_manager(&e, &caller)?;
        Pausable::unpause(&e);
        e.events().publish((symbol_short!("unpaused"),), caller);
        Ok(())
    }

    pub fn is_paused(e: Env) -> bool {
        Pausable::is_paused(&e)
    }

    // ── Base URI ─────────────────────────────────────────────────────────

    pub fn set_base_uri(e: Env, caller: Address, base_uri: String) -> Result<(), Error> {
        ensure_not_paused(&e)?;
        require_marketplace_manager(&e, &caller)?;
        e.storage().instance().set(&DataKey::BaseUri, &base_uri);
        e.events().publish((symbol_short!("base_uri"),), base_uri);
        Ok(())
    }

    pub fn base_uri(e: Env) -> Result<String, Error> {
        e.storage()
            .instance()
            .get(&DataKey::BaseUri)
            .ok_or(Error::NotInitialized)
    }

    // ── Catalogue management ─────────────────────────────────────────────

    /// List a new collection: deploy it through the factory, record its
    /// economic parameters and append it to both catalogue views.
    pub fn add_token(
        e: Env,
        caller: Address,
        name: String,
        symbol: String,
        params: TokenParams,
    ) -> Result<Address, Error> {
        ensure_not_paused(&e)?;
        require_marketplace_manager(&e, &caller)?;

        if !Validation::non_empty(&name) || !Validation::non_empty(&symbol) {
            return Err(Error::EmptyMetadata);
        }
        if params.is_disabled {
            return Err(Error::DisabledOnCreation);
        }
        validate_params(&params)?;

        let factory = get_address(&e, &DataKey::TokenFactory)?;
        let mut args = Vec::new(&e);
        args.push_back(e.current_contract_address().into_val(&e));
        args.push_back(name.clone().into_val(&e));
        args.push_back(symbol.clone().into_val(&e));
        let token_contract: Address =
            e.invoke_contract(&factory, &Symbol::new(&e, "deploy_collection"), args);

        write_params(&e, &token_contract, &params);

        let mut all = read_list(&e, &DataKey::TokenContracts);
        all.push_back(token_contract.clone());
        e.storage().instance().set(&DataKey::TokenContracts, &all);

        let mut active = read_list(&e, &DataKey::ActiveTokenContracts);
        active.push_back(token_contract.clone());
        e.storage()
            .instance()
            .set(&DataKey::ActiveTokenContracts, &active);

        e.events().publish(
            (symbol_short!("tkn_added"), token_contract.clone()),
            TokenContractDeployedEvent {
                token_contract: token_contract.clone(),
                token_name: name,
                token_symbol: symbol,
                token_params: params,
            },
        );

        Ok(token_contract)
    }

    /// Overwrite every parameter of an existing listing, fix up the active
    /// view and push the new name/symbol into the collection.
    pub fn update_all_params(
        e: Env,
        caller: Address,
        token_contract: Address,
        name: String,
        symbol: String,
        params: TokenParams,
    ) -> Result<(), Error> {
        ensure_not_paused(&e)?;
        require_marketplace_manager(&e, &caller)?;

        if !Validation::non_empty(&name) || !Validation::non_empty(&symbol) {
            return Err(Error::EmptyMetadata);
        }
        // errors if the listing is unknown
        read_params(&e, &token_contract)?;
        validate_params(&params)?;

        write_params(&e, &token_contract, &params);

        let mut active = read_list(&e, &DataKey::ActiveTokenContracts);
        let position = active.iter().position(|a| a == token_contract);
        match (params.is_disabled, position) {
            (true, Some(idx)) => {
                active.remove(idx as u32);
                e.storage()
                    .instance()
                    .set(&DataKey::ActiveTokenContracts, &active);
            }
            (false, None) => {
                active.push_back(token_contract.clone());
                e.storage()
                    .instance()
                    .set(&DataKey::ActiveTokenContracts, &active);
            }
            _ => {}
        }

        let this = e.current_contract_address();
        let mut args = Vec::new(&e);
        args.push_back(this.into_val(&e));
        args.push_back(name.clone().into_val(&e));
        args.push_back(symbol.clone().into_val(&e));
        e.invoke_contract::<()>(&token_contract, &Symbol::new(&e, "update_metadata"), args);

        e.events().publish(
            (symbol_short!("tkn_upd"), token_contract.clone()),
            TokenContractParamsUpdatedEvent {
                token_contract,
                token_name: name,
                token_symbol: symbol,
                token_params: params,
            },
        );

        Ok(())
    }

    // ── Purchase: currency / fungible / voucher lanes ────────────────────

    /// Settle a signed quote and mint `request.future_token_id` to `buyer`.
    ///
    /// Lane selection follows the quote: the native lane needs the native
    /// asset address and a nonzero price, a zero price selects the voucher
    /// lane, anything else is a plain fungible-token payment. The lanes are
    /// mutually exclusive; attaching native value to a non-native lane
    /// fails.
    ///
    /// The mint happens before any token-contract interaction so the
    /// sequential-id bookkeeping is settled before untrusted code runs; a
    /// storage guard additionally rejects re-entry outright.
    pub fn buy_token(
        e: Env,
        buyer: Address,
        request: BuyRequest,
        payment: PaymentDetails,
        signature: BytesN<64>,
        recovery_id: u32,
    ) -> Result<(), Error> {
        require_no_reentrancy(&e)?;
        set_reentrancy_guard(&e, true);

        ensure_not_paused(&e)?;
        buyer.require_auth();

        let params = read_params(&e, &request.token_contract)?;
        if params.is_disabled {
            return Err(Error::TokenIsDisabled);
        }
        if !Validation::is_valid_discount(request.discount) {
            return Err(Error::InvalidDiscount);
        }
        if payment.attached_currency < 0 || payment.payment_token_price < 0 {
            return Err(Error::InvalidAmount);
        }

        let this = e.current_contract_address();
        let digest = currency_quote_digest(
            &e,
            &this,
            &request,
            &payment.payment_token,
            payment.payment_token_price,
        );
        verify_quote(&e, &digest, request.end_timestamp, &signature, recovery_id)?;

        // Advance the collection's id bookkeeping before touching any
        // caller-supplied token contract.
        mint_purchased_token(
            &e,
            &request.token_contract,
            &buyer,
            request.future_token_id,
            &request.token_uri,
        );

        let native_token = get_address(&e, &DataKey::NativeToken)?;
        let paid_tokens: i128;

        if payment.payment_token == native_token && payment.payment_token_price != 0 {
            // Native lane: pull everything attached, forward exactly what is
            // owed, refund the change. A recipient or refund transfer that
            // fails aborts the whole purchase.
            let owed = compute_owed(
                &e,
                params.price_per_one_token,
                payment.payment_token_price,
                request.discount,
            )?;
            if payment.attached_currency < owed {
                return Err(Error::InsufficientCurrency);
            }
            let client = token::Client::new(&e, &native_token);
            client.transfer(&buyer, &this, &payment.attached_currency);
            if let Some(recipient) = &params.funds_recipient {
                if *recipient != this {
                    client.transfer(&this, recipient, &owed);
                }
            }
            let change = payment.attached_currency - owed;
            if change > 0 {
                client.transfer(&this, &buyer, &change);
            }
            paid_tokens = owed;
        } else if payment.payment_token_price == 0 {
            // Voucher lane: fixed voucher cost, no native value allowed.
            let voucher = params
                .voucher_token_contract
                .as_ref()
                .filter(|_| params.voucher_tokens_amount > 0)
                .ok_or(Error::VoucherNotConfigured)?;
            if payment.attached_currency != 0 {
                return Err(Error::NonZeroCurrency);
            }
            pull_and_route(
                &e,
                voucher,
                &buyer,
                &params.funds_recipient,
                params.voucher_tokens_amount,
            );
            paid_tokens = params.voucher_tokens_amount;
        } else {
            // Fungible lane: pull the owed amount in the quoted token.
            if payment.attached_currency != 0 {
                return Err(Error::NonZeroCurrency);
            }
            let owed = compute_owed(
                &e,
                params.price_per_one_token,
                payment.payment_token_price,
                request.discount,
            )?;
            pull_and_route(
                &e,
                &payment.payment_token,
                &buyer,
                &params.funds_recipient,
                owed,
            );
            paid_tokens = owed;
        }

        set_reentrancy_guard(&e, false);

        e.events().publish(
            (symbol_short!("minted"), request.token_contract.clone()),
            SuccessfullyMintedEvent {
                recipient: buyer,
                minted_token_info: MintedTokenInfo {
                    token_id: request.future_token_id,
                    minted_token_price: params.price_per_one_token,
                    token_uri: request.token_uri,
                },
                payment_token: payment.payment_token,
                paid_tokens,
                payment_token_price: payment.payment_token_price,
                discount: request.discount,
                funds_recipient: params.funds_recipient,
            },
        );

        Ok(())
    }

    // ── Purchase: NFT-collateral lane ────────────────────────────────────

    /// Settle a signed quote by taking an NFT into custody instead of
    /// currency. The recorded mint price is the listing's floor minimum,
    /// not the asserted market price.
    pub fn buy_token_by_nft(
        e: Env,
        buyer: Address,
        request: BuyRequest,
        nft: NftPayment,
        signature: BytesN<64>,
        recovery_id: u32,
    ) -> Result<(), Error> {
        require_no_reentrancy(&e)?;
        set_reentrancy_guard(&e, true);

        ensure_not_paused(&e)?;
        buyer.require_auth();

        let params = read_params(&e, &request.token_contract)?;
        if params.is_disabled {
            return Err(Error::TokenIsDisabled);
        }
        if !params.is_nft_buyable {
            return Err(Error::NftNotBuyable);
        }
        if nft.nft_floor_price < params.min_nft_floor_price {
            return Err(Error::FloorPriceTooLow);
        }

        let this = e.current_contract_address();
        let digest = nft_quote_digest(&e, &this, &request, &nft);
        verify_quote(&e, &digest, request.end_timestamp, &signature, recovery_id)?;

        let mut args = Vec::new(&e);
        args.push_back(nft.nft_token_id.into_val(&e));
        let nft_owner: Address =
            e.invoke_contract(&nft.nft_contract, &Symbol::new(&e, "owner_of"), args);
        if nft_owner != buyer {
            return Err(Error::NotNftOwner);
        }

        mint_purchased_token(
            &e,
            &request.token_contract,
            &buyer,
            request.future_token_id,
            &request.token_uri,
        );

        // Collateral moves into engine custody; it is never burned.
        let mut args = Vec::new(&e);
        args.push_back(buyer.clone().into_val(&e));
        args.push_back(this.into_val(&e));
        args.push_back(nft.nft_token_id.into_val(&e));
        e.invoke_contract::<()>(&nft.nft_contract, &Symbol::new(&e, "transfer"), args);

        set_reentrancy_guard(&e, false);

        e.events().publish(
            (symbol_short!("mint_nft"), request.token_contract.clone()),
            SuccessfullyMintedByNftEvent {
                recipient: buyer,
                minted_token_info: MintedTokenInfo {
                    token_id: request.future_token_id,
                    minted_token_price: params.min_nft_floor_price,
                    token_uri: request.token_uri,
                },
                nft_contract: nft.nft_contract,
                nft_token_id: nft.nft_token_id,
                nft_floor_price: nft.nft_floor_price,
                funds_recipient: params.funds_recipient,
            },
        );

        Ok(())
    }

    // ── Accounting & withdrawal ──────────────────────────────────────────

    /// Sweep the engine's entire balance of `token` to `recipient`.
    /// Available while paused; withdrawal-manager role required.
    pub fn withdraw_currency(
        e: Env,
        caller: Address,
        token: Address,
        recipient: Address,
    ) -> Result<(), Error> {
        require_withdrawal_manager(&e, &caller)?;

        let this = e.current_contract_address();
        let client = token::Client::new(&e, &token);
        let amount = client.balance(&this);
        if amount <= 0 {
            return Err(Error::NothingToWithdraw);
        }
        client.transfer(&this, &recipient, &amount);

        e.events().publish(
            (symbol_short!("withdrawn"), token.clone()),
            PaidTokensWithdrawnEvent {
                token,
                recipient,
                amount,
            },
        );
        Ok(())
    }

    // ── Paginated views ──────────────────────────────────────────────────

    pub fn get_token_contracts_count(e: Env) -> u32 {
        read_list(&e, &DataKey::TokenContracts).len()
    }

    pub fn get_active_tokens_count(e: Env) -> u32 {
        read_list(&e, &DataKey::ActiveTokenContracts).len()
    }

    pub fn get_token_contracts(e: Env, offset: u32, limit: u32) -> Vec<Address> {
        let all = read_list(&e, &DataKey::TokenContracts);
        Pagination::slice(&e, &all, offset, limit)
    }

    pub fn get_active_token_contracts(e: Env, offset: u32, limit: u32) -> Vec<Address> {
        let active = read_list(&e, &DataKey::ActiveTokenContracts);
        Pagination::slice(&e, &active, offset, limit)
    }

    /// Compact catalogue page: address, price and display name.
    pub fn get_base_token_params(e: Env, offset: u32, limit: u32) -> Vec<BaseTokenParams> {
        let all = read_list(&e, &DataKey::TokenContracts);
        let page = Pagination::slice(&e, &all, offset, limit);

        let mut out = Vec::new(&e);
        for token_contract in page.iter() {
            if let Some(params) = e
                .storage()
                .persistent()
                .get::<DataKey, TokenParams>(&DataKey::TokenParams(token_contract.clone()))
            {
                out.push_back(BaseTokenParams {
                    token_contract: token_contract.clone(),
                    price_per_one_token: params.price_per_one_token,
                    token_name: collection_string(&e, &token_contract, "name"),
                });
            }
        }
        out
    }

    /// Full catalogue page: everything the engine knows about each listing.
    pub fn get_detailed_token_params(e: Env, offset: u32, limit: u32) -> Vec<DetailedTokenParams> {
        let all = read_list(&e, &DataKey::TokenContracts);
        let page = Pagination::slice(&e, &all, offset, limit);

        let mut out = Vec::new(&e);
        for token_contract in page.iter() {
            if let Some(params) = e
                .storage()
                .persistent()
                .get::<DataKey, TokenParams>(&DataKey::TokenParams(token_contract.clone()))
            {
                out.push_back(DetailedTokenParams {
                    token_contract: token_contract.clone(),
                    token_params: params,
                    token_name: collection_string(&e, &token_contract, "name"),
                    token_symbol: collection_string(&e, &token_contract, "symbol"),
                });
            }
        }
        out
    }

    pub fn get_token_params(e: Env, token_contract: Address) -> Result<TokenParams, Error> {
        read_params(&e, &token_contract)
    }

    pub fn get_role_manager(e: Env) -> Result<Address, Error> {
        get_address(&e, &DataKey::RoleManager)
    }

    pub fn get_token_factory(e: Env) -> Result<Address, Error> {
        get_address(&e, &DataKey::TokenFactory)
    }

    pub fn get_native_token(e: Env) -> Result<Address, Error> {
        get_address(&e, &DataKey::NativeToken)
    }
}
