//! Signed position-open requests
//!
//! A user authorizes a position by signing every request field under the
//! deployment's domain. The operator submits the request; the ledger admits
//! it only if the deadline has not passed, the nonce is the one the
//! registry expects, and the signature recovers to the user.

use crate::position::Terms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strike_common::{
    Digest, Domain, Identity, OrderRef, ProtocolError, Result, Signature, SignatureVerifier,
    StructHasher, Timestamp,
};

const OPEN_REQUEST_TYPE: &str = "OpenRequest(bytes32 user,bytes32 collateralToken,\
uint128 collateralAmount,uint128 potentialPayout,uint64 expiry,uint128 strikePrice,\
bool isCall,uint8 optionType,uint128 boundaryLower,uint128 boundaryUpper,\
uint128 openPrice,bytes32 orderReference,uint64 nonce,uint64 deadline)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub user: Identity,
    pub collateral_token: Identity,
    pub collateral_amount: u128,
    pub potential_payout: u128,
    pub expiry: Timestamp,
    pub terms: Terms,
    pub open_price: u128,
    pub order_ref: OrderRef,
    pub nonce: u64,
    pub deadline: Timestamp,
}

impl OpenRequest {
    pub fn struct_hash(&self) -> Digest {
        StructHasher::new(OPEN_REQUEST_TYPE)
            .identity(&self.user)
            .identity(&self.collateral_token)
            .u128(self.collateral_amount)
            .u128(self.potential_payout)
            .u64(self.expiry)
            .u128(self.terms.strike_price)
            .bool(self.terms.is_call)
            .u8(self.terms.option_type.ordinal())
            .u128(self.terms.boundary_lower)
            .u128(self.terms.boundary_upper)
            .u128(self.open_price)
            .bytes32(&self.order_ref.0)
            .u64(self.nonce)
            .u64(self.deadline)
            .finish()
    }

    /// Digest the user signs under `domain`
    pub fn digest(&self, domain: &Domain) -> Digest {
        domain.typed_digest(&self.struct_hash())
    }
}

/// Next expected request nonce per user
#[derive(Debug, Clone, Default)]
pub struct NonceRegistry {
    next: BTreeMap<Identity, u64>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &Identity) -> u64 {
        self.next.get(user).copied().unwrap_or(0)
    }

    /// Consume the current nonce; called once per admitted request
    pub(crate) fn advance(&mut self, user: &Identity) {
        let n = self.next.entry(*user).or_insert(0);
        *n = n.saturating_add(1);
    }
}

/// Stateless request verification
pub struct RequestAuthenticator<V> {
    domain: Domain,
    verifier: V,
}

impl<V: SignatureVerifier> RequestAuthenticator<V> {
    pub fn new(domain: Domain, verifier: V) -> Self {
        Self { domain, verifier }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Recover the signer of `digest`
    pub fn recover(&self, digest: &Digest, signature: &Signature) -> Option<Identity> {
        self.verifier.recover(digest, signature)
    }

    /// Check deadline, nonce and signature, in that order
    ///
    /// Does not consume the nonce.
    pub fn authenticate(
        &self,
        nonces: &NonceRegistry,
        request: &OpenRequest,
        signature: &Signature,
        now: Timestamp,
    ) -> Result<()> {
        if now > request.deadline {
            return Err(ProtocolError::Expired);
        }
        if request.nonce != nonces.get(&request.user) {
            return Err(ProtocolError::InvalidNonce);
        }
        let digest = request.digest(&self.domain);
        if self.recover(&digest, signature) != Some(request.user) {
            log::warn!("open request for {} carries a foreign signature", request.user);
            return Err(ProtocolError::InvalidSignature);
        }
        Ok(())
    }
}
