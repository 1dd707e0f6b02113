//! Single active-operation guard
//!
//! A ledger that is reachable from more than one place (the keeper calls the
//! pool directly, the settlement engine calls it through `LiquidityPool`) is
//! wrapped in a `Guarded` handle. Only one operation can hold the ledger at a
//! time; a nested call arriving through a collaborator callback while an
//! operation is in flight gets `Reentrancy` instead of a second `&mut`.

use crate::error::{ProtocolError, Result};
use crate::interfaces::{LiquidityPool, TokenLedger};
use crate::types::Identity;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Guarded<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for Guarded<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Run a state-changing operation with exclusive access
    pub fn enter<R>(&self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| {
            log::warn!("rejected re-entrant call into guarded ledger");
            ProtocolError::Reentrancy
        })?;
        f(&mut inner)
    }

    /// Read-only access; fails while a state-changing operation is in flight
    pub fn view<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let inner = self
            .inner
            .try_borrow()
            .map_err(|_| ProtocolError::Reentrancy)?;
        Ok(f(&inner))
    }

    /// True while some operation holds the ledger
    pub fn is_entered(&self) -> bool {
        self.inner.try_borrow_mut().is_err()
    }
}

impl<P: LiquidityPool> LiquidityPool for Guarded<P> {
    fn available_liquidity(&self, tokens: &dyn TokenLedger, caller: &Identity) -> Result<u128> {
        self.view(|pool| pool.available_liquidity(tokens, caller))?
    }

    fn pay_out(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        to: &Identity,
        amount: u128,
    ) -> Result<()> {
        self.enter(|pool| pool.pay_out(tokens, caller, to, amount))
    }

    fn absorb_forfeit(
        &mut self,
        tokens: &mut dyn TokenLedger,
        from: &Identity,
        amount: u128,
    ) -> Result<()> {
        self.enter(|pool| pool.absorb_forfeit(tokens, from, amount))
    }
}
