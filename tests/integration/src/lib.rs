//! Strike integration test fixtures
//!
//! Wires a real pool, options engine and in-memory token the way a
//! deployment does, with Ed25519 keys derived from fixed seeds.

use ed25519_dalek::SigningKey;
use strike_common::{
    identity_of, sign_digest, Domain, Ed25519Verifier, Guarded, Identity, MemoryToken,
    OraclePrice, OrderBook, OrderRef, PositionId, Result, Signature, SignedPrice, Timestamp,
};
use strike_options::{AdminConfig, OpenRequest, OptionType, SettlementEngine, Terms};
use strike_pool::{LoanLedger, PoolConfig, RateConfig};

/// Engine time the fixtures open positions at
pub const START: Timestamp = 1_000;

/// Default position lifetime
pub const LIFETIME: Timestamp = 3_600;

pub const COLLATERAL: u128 = 1_000;
pub const PAYOUT: u128 = 1_900;

/// Deterministic signing key
pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// Order venue that records cancellations
#[derive(Debug, Default)]
pub struct RecordingBook {
    pub cancelled: Vec<OrderRef>,
}

impl OrderBook for RecordingBook {
    fn cancel_order(&mut self, _metadata: &[u8], order_ref: &OrderRef) -> Result<()> {
        self.cancelled.push(*order_ref);
        Ok(())
    }
}

pub type Pool = Guarded<LoanLedger>;
pub type Engine = SettlementEngine<Pool, RecordingBook, Ed25519Verifier>;

pub struct World {
    pub token: MemoryToken,
    pub pool: Pool,
    pub engine: Engine,
    pub domain: Domain,
    pub owner: Identity,
    pub operator: Identity,
    pub order_book: Identity,
    pub manager: Identity,
    pub pool_account: Identity,
    pub custody: Identity,
    pub asset: Identity,
    pub oracle_key: SigningKey,
}

impl World {
    pub fn new() -> Self {
        let owner = Identity::new([1; 32]);
        let operator = Identity::new([2; 32]);
        let order_book = Identity::new([3; 32]);
        let manager = Identity::new([4; 32]);
        let pool_account = Identity::new([5; 32]);
        let custody = Identity::new([6; 32]);
        let asset = Identity::new([7; 32]);
        let oracle_key = key(200);

        let domain = Domain {
            verifying_party: custody,
            ..Domain::default()
        };

        let pool = Guarded::new(LoanLedger::new(PoolConfig {
            account: pool_account,
            owner,
            manager,
            settlement_account: custody,
            rate: RateConfig::default(),
        }));

        let engine = SettlementEngine::new(
            AdminConfig {
                oracle: identity_of(&oracle_key),
                operator,
                order_book,
                domain: domain.clone(),
                ..AdminConfig::new(owner, custody, asset)
            },
            Ed25519Verifier,
            pool.clone(),
            RecordingBook::default(),
        );

        Self {
            token: MemoryToken::new(domain.clone()),
            pool,
            engine,
            domain,
            owner,
            operator,
            order_book,
            manager,
            pool_account,
            custody,
            asset,
            oracle_key,
        }
    }

    /// Mint to `lp`, approve the pool and deposit `amount`
    pub fn seed_liquidity(&mut self, lp: &Identity, amount: u128) -> u128 {
        self.token.mint(lp, amount);
        self.token.approve(lp, &self.pool_account, u128::MAX);
        let token = &mut self.token;
        self.pool
            .enter(|p| p.deposit(token, lp, amount))
            .expect("seed deposit")
    }

    /// A user with `balance` tokens and an allowance for the custody account
    pub fn funded_user(&mut self, seed: u8, balance: u128) -> (SigningKey, Identity) {
        let signer = key(seed);
        let user = identity_of(&signer);
        self.token.mint(&user, balance);
        self.token.approve(&user, &self.custody, u128::MAX);
        (signer, user)
    }

    pub fn request(&self, user: &Identity, terms: Terms, now: Timestamp) -> OpenRequest {
        OpenRequest {
            user: *user,
            collateral_token: self.asset,
            collateral_amount: COLLATERAL,
            potential_payout: PAYOUT,
            expiry: now + LIFETIME,
            terms,
            open_price: terms.strike_price,
            order_ref: OrderRef::new([self.engine.nonce_of(user) as u8 + 100; 32]),
            nonce: self.engine.nonce_of(user),
            deadline: now + 30,
        }
    }

    pub fn sign(&self, signer: &SigningKey, request: &OpenRequest) -> Signature {
        sign_digest(signer, &request.digest(&self.domain))
    }

    /// Sign and submit an open request through the operator
    pub fn open(&mut self, signer: &SigningKey, terms: Terms, now: Timestamp) -> Result<PositionId> {
        let user = identity_of(signer);
        let request = self.request(&user, terms, now);
        let signature = self.sign(signer, &request);
        let operator = self.operator;
        self.engine
            .open_position(&mut self.token, &operator, &request, &signature, now)
    }

    pub fn oracle_price(&self, price: u128, timestamp: Timestamp) -> SignedPrice {
        let data = OraclePrice { price, timestamp };
        SignedPrice {
            data,
            signature: sign_digest(&self.oracle_key, &data.digest(&self.domain)),
        }
    }

    pub fn total_assets(&self) -> u128 {
        self.pool.view(|p| p.total_assets()).expect("pool idle")
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

pub fn high_low(is_call: bool, strike: u128) -> Terms {
    Terms {
        option_type: OptionType::HighLow,
        is_call,
        strike_price: strike,
        boundary_lower: 0,
        boundary_upper: 0,
    }
}

pub fn range(option_type: OptionType, lower: u128, upper: u128) -> Terms {
    Terms {
        option_type,
        is_call: true,
        strike_price: (lower + upper) / 2,
        boundary_lower: lower,
        boundary_upper: upper,
    }
}
