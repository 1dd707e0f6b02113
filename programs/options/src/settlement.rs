//! Position lifecycle: open, settle, expire, cancel
//!
//! Every entry point follows the same order:
//! 1. validate against current state (roles, status, timing, signatures)
//! 2. pre-check the balances the external calls will need
//! 3. make the external calls (token, pool, order book)
//! 4. commit the status change and record events
//!
//! Step 4 cannot fail, so a rejected call leaves the ledger untouched.
//!
//! Timing:
//! - settle needs `now > expiry` and `now >= open_timestamp + min_settlement_delay`
//! - the oracle observation must fall inside `[open_timestamp, expiry]`
//! - expire needs `now > expiry` and is open to anyone

use crate::admin::AdminConfig;
use crate::auth::{OpenRequest, RequestAuthenticator};
use crate::ledger::PositionLedger;
use crate::position::{Position, PositionStatus};
use model_safety::math::{add_u128, bps_of, sub_u128};
use serde::{Deserialize, Serialize};
use strike_common::{
    Domain, Ed25519Verifier, Event, EventLog, HookPayload, Identity, LiquidityPool, OrderBook,
    OrderRef, PermitApprover, PositionId, ProtocolError, Result, Signature, SignatureVerifier,
    SignedPrice, Timestamp, TokenLedger,
};

/// Gasless approval attached to an open request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitArgs {
    pub amount: u128,
    pub deadline: Timestamp,
    pub signature: Signature,
}

pub struct SettlementEngine<P, O, V = Ed25519Verifier> {
    config: AdminConfig,
    auth: RequestAuthenticator<V>,
    positions: PositionLedger,
    pool: P,
    order_book: O,
    events: EventLog,
}

impl<P, O, V> SettlementEngine<P, O, V>
where
    P: LiquidityPool,
    O: OrderBook,
    V: SignatureVerifier,
{
    pub fn new(config: AdminConfig, verifier: V, pool: P, order_book: O) -> Self {
        let auth = RequestAuthenticator::new(config.domain.clone(), verifier);
        Self {
            config,
            auth,
            positions: PositionLedger::new(),
            pool,
            order_book,
            events: EventLog::new(),
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn domain(&self) -> &Domain {
        self.auth.domain()
    }

    pub fn positions(&self) -> &PositionLedger {
        &self.positions
    }

    pub fn position(&self, id: &PositionId) -> Result<&Position> {
        self.positions.position(id)
    }

    pub fn nonce_of(&self, user: &Identity) -> u64 {
        self.positions.nonce_of(user)
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn order_book(&self) -> &O {
        &self.order_book
    }

    pub fn pending_events(&self) -> &[Event] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    // ========================================================================
    // Open
    // ========================================================================

    /// Admit a user-signed request submitted by the operator
    ///
    /// Collateral is pulled from the user against an allowance granted to
    /// the custody account.
    pub fn open_position(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        request: &OpenRequest,
        signature: &Signature,
        now: Timestamp,
    ) -> Result<PositionId> {
        self.validate_open(caller, request, signature, now)?;
        self.commit_open(tokens, request, now)
    }

    /// `open_position` with the collateral allowance granted by `permit`
    /// in the same call
    pub fn open_position_with_permit<T>(
        &mut self,
        tokens: &mut T,
        caller: &Identity,
        request: &OpenRequest,
        signature: &Signature,
        permit: &PermitArgs,
        now: Timestamp,
    ) -> Result<PositionId>
    where
        T: TokenLedger + PermitApprover,
    {
        self.validate_open(caller, request, signature, now)?;
        // The permit commits on the token, so the pull after it must not fail
        if permit.amount < request.collateral_amount {
            return Err(ProtocolError::InsufficientAllowance);
        }
        if tokens.balance_of(&request.user) < request.collateral_amount {
            return Err(ProtocolError::InsufficientBalance);
        }
        tokens.permit(
            &request.user,
            &self.config.custody,
            permit.amount,
            permit.deadline,
            now,
            &permit.signature,
        )?;
        self.commit_open(tokens, request, now)
    }

    fn validate_open(
        &self,
        caller: &Identity,
        request: &OpenRequest,
        signature: &Signature,
        now: Timestamp,
    ) -> Result<()> {
        self.config.ensure_operator(caller)?;
        self.auth
            .authenticate(self.positions.nonces(), request, signature, now)?;

        if request.collateral_token != self.config.asset {
            return Err(ProtocolError::UnsupportedCollateral);
        }
        if request.collateral_amount == 0 || request.potential_payout < request.collateral_amount {
            return Err(ProtocolError::InvalidAmount);
        }
        request.terms.validate()?;

        let earliest_expiry = now
            .checked_add(self.config.min_settlement_delay)
            .ok_or(ProtocolError::InvalidExpiry)?;
        if request.expiry <= earliest_expiry {
            return Err(ProtocolError::InvalidExpiry);
        }
        Ok(())
    }

    fn commit_open(
        &mut self,
        tokens: &mut dyn TokenLedger,
        request: &OpenRequest,
        now: Timestamp,
    ) -> Result<PositionId> {
        let custody = self.config.custody;
        tokens.transfer_from(&custody, &request.user, &custody, request.collateral_amount)?;

        let id = self.positions.admit(self.auth.domain(), request, now);

        log::info!(
            "position {} opened for {}: {:?} collateral {} payout {} expiry {}",
            id,
            request.user,
            request.terms.option_type,
            request.collateral_amount,
            request.potential_payout,
            request.expiry
        );
        self.events.emit(Event::PositionOpened {
            id,
            user: request.user,
            option_type: request.terms.option_type.ordinal(),
            collateral: request.collateral_amount,
            potential_payout: request.potential_payout,
            expiry: request.expiry,
        });
        Ok(id)
    }

    // ========================================================================
    // Settle
    // ========================================================================

    /// Resolve an active position against a signed oracle price
    ///
    /// Callable by anyone; the oracle signature is the authority. Returns
    /// whether the position won.
    pub fn settle(
        &mut self,
        tokens: &mut dyn TokenLedger,
        id: &PositionId,
        oracle: &SignedPrice,
        now: Timestamp,
    ) -> Result<bool> {
        let won = self.check_settlement(id, oracle, now)?;
        self.apply_outcome(tokens, id, won)?;
        Ok(won)
    }

    /// Order-book entry point, invoked before the order behind `order_ref`
    /// fills
    ///
    /// `extra_data` is a `HookPayload`. A losing position also has its
    /// order cancelled.
    pub fn pre_transfer_hook(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        order_ref: &OrderRef,
        extra_data: &[u8],
        now: Timestamp,
    ) -> Result<bool> {
        if *caller != self.config.order_book {
            log::warn!("hook call rejected for {}", caller);
            return Err(ProtocolError::Unauthorized);
        }
        let payload = HookPayload::decode(extra_data)?;
        let id = payload.position_id;
        if self.positions.position(&id)?.order_ref != *order_ref {
            return Err(ProtocolError::OrderMismatch);
        }

        let won = self.check_settlement(&id, &payload.oracle, now)?;
        if !won {
            self.ensure_custody_covers(tokens, &id)?;
            self.order_book.cancel_order(extra_data, order_ref)?;
        }
        self.apply_outcome(tokens, &id, won)?;

        if !won {
            self.events.emit(Event::OrderCancelled { id });
        }
        Ok(won)
    }

    fn check_settlement(
        &self,
        id: &PositionId,
        oracle: &SignedPrice,
        now: Timestamp,
    ) -> Result<bool> {
        let position = self.positions.active(id)?;

        let earliest = position
            .open_timestamp
            .saturating_add(self.config.min_settlement_delay);
        if now <= position.expiry || now < earliest {
            return Err(ProtocolError::TooEarly);
        }

        let digest = oracle.data.digest(self.auth.domain());
        if self.auth.recover(&digest, &oracle.signature) != Some(self.config.oracle) {
            log::warn!("position {}: oracle price not signed by the oracle", id);
            return Err(ProtocolError::InvalidOracleSignature);
        }

        let observed = oracle.data.timestamp;
        if observed < position.open_timestamp || observed > position.expiry {
            return Err(ProtocolError::OracleDataOutOfRange);
        }

        Ok(position.wins(oracle.data.price))
    }

    /// Custody must still hold the collateral the outcome will move
    fn ensure_custody_covers(&self, tokens: &dyn TokenLedger, id: &PositionId) -> Result<()> {
        let collateral = self.positions.active(id)?.collateral_amount;
        if tokens.balance_of(&self.config.custody) < collateral {
            return Err(ProtocolError::InsufficientBalance);
        }
        Ok(())
    }

    fn apply_outcome(
        &mut self,
        tokens: &mut dyn TokenLedger,
        id: &PositionId,
        won: bool,
    ) -> Result<()> {
        self.ensure_custody_covers(tokens, id)?;
        let position = self.positions.active(id)?;
        let user = position.user;
        let collateral = position.collateral_amount;
        let payout = position.potential_payout;
        let custody = self.config.custody;

        if won {
            let available = self.pool.available_liquidity(tokens, &custody)?;
            if add_u128(available, collateral) < payout {
                return Err(ProtocolError::InsufficientLiquidity);
            }
            // Stake joins the pool, the pool pays the gross payout
            self.pool.absorb_forfeit(tokens, &custody, collateral)?;
            self.pool.pay_out(tokens, &custody, &user, payout)?;
            self.positions.finalize(id, PositionStatus::Won)?;

            log::info!("position {} won: {} paid to {}", id, payout, user);
            self.events.emit(Event::PositionSettled {
                id: *id,
                won: true,
                payout,
            });
        } else {
            self.pool.absorb_forfeit(tokens, &custody, collateral)?;
            self.positions.finalize(id, PositionStatus::Lost)?;

            log::info!("position {} lost: {} forfeited to the pool", id, collateral);
            self.events.emit(Event::PositionSettled {
                id: *id,
                won: false,
                payout: 0,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Expire / cancel
    // ========================================================================

    /// Refund an unresolved position after expiry, less the processing fee
    ///
    /// Callable by anyone. Returns the refund.
    pub fn expire(
        &mut self,
        tokens: &mut dyn TokenLedger,
        id: &PositionId,
        now: Timestamp,
    ) -> Result<u128> {
        let position = self.positions.active(id)?;
        if now <= position.expiry {
            return Err(ProtocolError::TooEarly);
        }
        let user = position.user;
        let collateral = position.collateral_amount;
        let custody = self.config.custody;

        let fee = bps_of(collateral, self.config.fee_bps).min(collateral);
        let refund = sub_u128(collateral, fee);

        self.ensure_custody_covers(tokens, id)?;
        if fee > 0 {
            self.pool.absorb_forfeit(tokens, &custody, fee)?;
        }
        if refund > 0 {
            tokens.transfer(&custody, &user, refund)?;
        }
        self.positions.finalize(id, PositionStatus::Expired)?;

        log::info!("position {} expired: refund {} fee {}", id, refund, fee);
        self.events.emit(Event::PositionExpired {
            id: *id,
            refund,
            fee,
        });
        self.events.emit(Event::PositionSettled {
            id: *id,
            won: false,
            payout: 0,
        });
        Ok(refund)
    }

    /// Operator unwinds an active position, returning the full collateral
    pub fn cancel_position(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        id: &PositionId,
    ) -> Result<u128> {
        self.config.ensure_operator(caller)?;
        let position = self.positions.active(id)?;
        let user = position.user;
        let refund = position.collateral_amount;

        tokens.transfer(&self.config.custody, &user, refund)?;
        self.positions.finalize(id, PositionStatus::Cancelled)?;

        log::info!("position {} cancelled: {} returned to {}", id, refund, user);
        self.events.emit(Event::PositionCancelled { id: *id, refund });
        Ok(refund)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub fn set_oracle(&mut self, caller: &Identity, oracle: Identity) -> Result<()> {
        let event = self.config.set_oracle(caller, oracle)?;
        self.events.emit(event);
        Ok(())
    }

    pub fn set_operator(&mut self, caller: &Identity, operator: Identity) -> Result<()> {
        let event = self.config.set_operator(caller, operator)?;
        self.events.emit(event);
        Ok(())
    }

    pub fn set_order_book(&mut self, caller: &Identity, order_book: Identity) -> Result<()> {
        let event = self.config.set_order_book(caller, order_book)?;
        self.events.emit(event);
        Ok(())
    }

    pub fn set_fee_bps(&mut self, caller: &Identity, fee_bps: u16) -> Result<()> {
        let event = self.config.set_fee_bps(caller, fee_bps)?;
        self.events.emit(event);
        Ok(())
    }

    pub fn set_min_settlement_delay(&mut self, caller: &Identity, secs: u64) -> Result<()> {
        let event = self.config.set_min_settlement_delay(caller, secs)?;
        self.events.emit(event);
        Ok(())
    }

    /// Emergency transfer out of the custody account
    pub fn recover_assets(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        to: &Identity,
        amount: u128,
    ) -> Result<()> {
        self.config.ensure_owner(caller)?;
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        tokens.transfer(&self.config.custody, to, amount)?;

        log::warn!("recovered {} from custody to {}", amount, to);
        self.events.emit(Event::AssetsRecovered { to: *to, amount });
        Ok(())
    }
}
