//! In-memory token ledger
//!
//! Stand-in for the external token contract: balances, allowances and
//! signed permits. Used by the keeper's simulation and by tests.

use crate::crypto::{Domain, Ed25519Verifier, StructHasher};
use crate::error::{ProtocolError, Result};
use crate::interfaces::{PermitApprover, SignatureVerifier, TokenLedger};
use crate::types::{Digest, Identity, Signature, Timestamp};
use std::collections::HashMap;

pub struct MemoryToken<V = Ed25519Verifier> {
    domain: Domain,
    verifier: V,
    balances: HashMap<Identity, u128>,
    allowances: HashMap<(Identity, Identity), u128>,
    permit_nonces: HashMap<Identity, u64>,
}

impl MemoryToken<Ed25519Verifier> {
    pub fn new(domain: Domain) -> Self {
        Self::with_verifier(domain, Ed25519Verifier)
    }
}

impl<V: SignatureVerifier> MemoryToken<V> {
    pub fn with_verifier(domain: Domain, verifier: V) -> Self {
        Self {
            domain,
            verifier,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            permit_nonces: HashMap::new(),
        }
    }

    /// Create tokens out of thin air
    pub fn mint(&mut self, to: &Identity, amount: u128) {
        let bal = self.balances.entry(*to).or_insert(0);
        *bal = bal.saturating_add(amount);
    }

    pub fn approve(&mut self, owner: &Identity, spender: &Identity, amount: u128) {
        self.allowances.insert((*owner, *spender), amount);
    }

    pub fn permit_nonce(&self, owner: &Identity) -> u64 {
        self.permit_nonces.get(owner).copied().unwrap_or(0)
    }

    /// Digest an owner signs to grant a permit at their current nonce
    pub fn permit_digest(
        &self,
        owner: &Identity,
        spender: &Identity,
        amount: u128,
        deadline: Timestamp,
    ) -> Digest {
        let struct_hash = StructHasher::new(
            "Permit(bytes32 owner,bytes32 spender,uint128 value,uint64 nonce,uint64 deadline)",
        )
        .identity(owner)
        .identity(spender)
        .u128(amount)
        .u64(self.permit_nonce(owner))
        .u64(deadline)
        .finish();
        self.domain.typed_digest(&struct_hash)
    }

    fn debit(&mut self, from: &Identity, amount: u128) -> Result<()> {
        let bal = self.balances.get(from).copied().unwrap_or(0);
        if bal < amount {
            return Err(ProtocolError::InsufficientBalance);
        }
        self.balances.insert(*from, bal - amount);
        Ok(())
    }

    fn credit(&mut self, to: &Identity, amount: u128) {
        let bal = self.balances.entry(*to).or_insert(0);
        *bal = bal.saturating_add(amount);
    }
}

impl<V: SignatureVerifier> TokenLedger for MemoryToken<V> {
    fn balance_of(&self, who: &Identity) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Identity, spender: &Identity) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Identity, to: &Identity, amount: u128) -> Result<()> {
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Identity,
        from: &Identity,
        to: &Identity,
        amount: u128,
    ) -> Result<()> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(ProtocolError::InsufficientAllowance);
        }
        self.debit(from, amount)?;
        self.allowances.insert((*from, *spender), allowed - amount);
        self.credit(to, amount);
        Ok(())
    }
}

impl<V: SignatureVerifier> PermitApprover for MemoryToken<V> {
    fn permit(
        &mut self,
        owner: &Identity,
        spender: &Identity,
        amount: u128,
        deadline: Timestamp,
        now: Timestamp,
        signature: &Signature,
    ) -> Result<()> {
        if now > deadline {
            return Err(ProtocolError::ExpiredPermit);
        }
        let digest = self.permit_digest(owner, spender, amount, deadline);
        if self.verifier.recover(&digest, signature) != Some(*owner) {
            return Err(ProtocolError::InvalidPermitSignature);
        }
        *self.permit_nonces.entry(*owner).or_insert(0) += 1;
        self.approve(owner, spender, amount);
        Ok(())
    }
}
