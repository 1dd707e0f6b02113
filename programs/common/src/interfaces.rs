//! Collaborator interfaces consumed by the ledgers
//!
//! Token custody, approvals, signature recovery and the order-matching
//! venue live outside the engine. Ledgers see them only through these
//! traits, which keeps every ledger testable with in-memory stand-ins.

use crate::error::Result;
use crate::types::{Digest, Identity, OrderRef, Signature, Timestamp};

/// Fungible token balances and allowances
pub trait TokenLedger {
    fn balance_of(&self, who: &Identity) -> u128;

    fn allowance(&self, owner: &Identity, spender: &Identity) -> u128;

    /// Move `amount` out of `from`, which must be the account the caller
    /// controls (the pool or the options custody account)
    ///
    /// Fails with `InsufficientBalance`.
    fn transfer(&mut self, from: &Identity, to: &Identity, amount: u128) -> Result<()>;

    /// Move `amount` from `from` to `to` against the allowance `from`
    /// granted to `spender`
    ///
    /// Fails with `InsufficientBalance` or `InsufficientAllowance`.
    fn transfer_from(
        &mut self,
        spender: &Identity,
        from: &Identity,
        to: &Identity,
        amount: u128,
    ) -> Result<()>;
}

/// Gasless approvals
pub trait PermitApprover {
    /// Grant `spender` an allowance of `amount` on behalf of `owner`
    ///
    /// Fails with `ExpiredPermit` or `InvalidPermitSignature`.
    fn permit(
        &mut self,
        owner: &Identity,
        spender: &Identity,
        amount: u128,
        deadline: Timestamp,
        now: Timestamp,
        signature: &Signature,
    ) -> Result<()>;
}

/// Signer recovery over a 32-byte typed digest
pub trait SignatureVerifier {
    /// The identity that produced `signature` over `digest`, if any
    fn recover(&self, digest: &Digest, signature: &Signature) -> Option<Identity>;
}

/// Shared liquidity the settlement engine pays winners from
pub trait LiquidityPool {
    /// Largest `pay_out` that `caller` can draw right now
    ///
    /// Fails with `Unauthorized` if `caller` may not draw at all, so a
    /// settlement can reject the call before moving any funds.
    fn available_liquidity(&self, tokens: &dyn TokenLedger, caller: &Identity) -> Result<u128>;

    /// Pay `amount` of pool assets to `to`
    ///
    /// `caller` must be the settlement account the pool was configured with.
    fn pay_out(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        to: &Identity,
        amount: u128,
    ) -> Result<()>;

    /// Pull `amount` from `from` into the pool as yield (no shares minted)
    fn absorb_forfeit(
        &mut self,
        tokens: &mut dyn TokenLedger,
        from: &Identity,
        amount: u128,
    ) -> Result<()>;
}

/// External limit-order venue
pub trait OrderBook {
    /// Cancel the order behind `order_ref`
    ///
    /// `metadata` is the payload the venue handed to the pre-transfer hook.
    fn cancel_order(&mut self, metadata: &[u8], order_ref: &OrderRef) -> Result<()>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn recover(&self, digest: &Digest, signature: &Signature) -> Option<Identity> {
        (**self).recover(digest, signature)
    }
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for Box<T> {
    fn recover(&self, digest: &Digest, signature: &Signature) -> Option<Identity> {
        (**self).recover(digest, signature)
    }
}
