//! Loan ledger: share-based LP accounting plus utilization-priced loans
//!
//! Accounting model:
//! - `idle` is the ledger's believed token balance of the pool account
//! - `outstanding` is lent principal not yet returned
//! - `total_assets = idle + outstanding` prices LP shares
//!
//! Key invariants:
//! - Every state-changing operation reconciles first: if the pool account
//!   holds more than `idle`, the surplus is interest income and `idle` rises
//!   to match. Reconciliation never lowers `idle`.
//! - Fallible external transfers run before any field is written, so a
//!   failed call leaves the ledger untouched.
//! - `outstanding` is maintained incrementally and always equals a full
//!   scan over the loan log (`utilization_scan`).

use crate::loan::Loan;
use crate::rate::{RateConfig, RateCurve};
use model_safety::helpers::{utilization_wad, PoolSnapshot};
use model_safety::math::{add_u128, clamp_pos_i128, mul_div, sub_u128};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strike_common::{
    Event, EventLog, Identity, LiquidityPool, ProtocolError, Result, Timestamp, TokenLedger,
};

/// Pool wiring and parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Token account holding the pool's idle assets
    pub account: Identity,
    /// Can change the manager, settlement account and rate curve
    pub owner: Identity,
    /// Only identity allowed to borrow
    pub manager: Identity,
    /// Only identity allowed to draw payouts through `LiquidityPool`
    pub settlement_account: Identity,
    #[serde(default)]
    pub rate: RateConfig,
}

pub struct LoanLedger {
    config: PoolConfig,
    curve: RateCurve,
    idle: u128,
    outstanding: u128,
    total_shares: u128,
    shares: BTreeMap<Identity, u128>,
    loans: Vec<Loan>,
    events: EventLog,
}

impl LoanLedger {
    pub fn new(config: PoolConfig) -> Self {
        let curve = RateCurve::new(config.rate);
        Self {
            config,
            curve,
            idle: 0,
            outstanding: 0,
            total_shares: 0,
            shares: BTreeMap::new(),
            loans: Vec::new(),
            events: EventLog::new(),
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn account(&self) -> &Identity {
        &self.config.account
    }

    pub fn total_assets(&self) -> u128 {
        add_u128(self.idle, self.outstanding)
    }

    pub fn idle_assets(&self) -> u128 {
        self.idle
    }

    pub fn outstanding(&self) -> u128 {
        self.outstanding
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn shares_of(&self, who: &Identity) -> u128 {
        self.shares.get(who).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot::new(self.total_assets(), self.total_shares)
    }

    /// Assets backing one share, 1e18 fixed point
    pub fn share_price(&self) -> u128 {
        self.snapshot().assets_per_share()
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    pub fn loan(&self, loan_id: u64) -> Result<&Loan> {
        usize::try_from(loan_id)
            .ok()
            .and_then(|i| self.loans.get(i))
            .ok_or(ProtocolError::InvalidLoan)
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    /// Shares `amount` would mint right now (before reconciliation)
    pub fn preview_deposit(&self, amount: u128) -> Result<u128> {
        if self.total_shares == 0 {
            return Ok(amount);
        }
        let assets = self.total_assets();
        if assets == 0 {
            // Every existing share is worthless; minting against them would
            // hand the new deposit to the old holders
            return Err(ProtocolError::InsufficientLiquidity);
        }
        mul_div(amount, self.total_shares, assets).ok_or(ProtocolError::Overflow)
    }

    /// Assets `shares` would redeem right now (before reconciliation)
    pub fn preview_withdraw(&self, shares: u128) -> Result<u128> {
        if self.total_shares == 0 {
            return Ok(0);
        }
        mul_div(shares, self.total_assets(), self.total_shares).ok_or(ProtocolError::Overflow)
    }

    /// Outstanding principal over total assets, 1e18 fixed point
    pub fn utilization(&self) -> u128 {
        utilization_wad(self.outstanding, self.total_assets())
    }

    /// Same as `utilization`, recomputed from the full loan log
    pub fn utilization_scan(&self) -> u128 {
        let outstanding = self
            .loans
            .iter()
            .fold(0u128, |acc, l| add_u128(acc, l.outstanding_principal()));
        utilization_wad(outstanding, self.total_assets())
    }

    /// Current per-second borrow rate, 1e18 fixed point
    pub fn current_rate(&self) -> i128 {
        self.curve.per_second_rate(self.utilization())
    }

    /// Interest owed on `loan_id` at `now`
    ///
    /// Read-through: utilization, and so the rate, is evaluated on every
    /// call. Two calls inside one operation can differ if utilization moved
    /// in between.
    pub fn interest_owed(&self, loan_id: u64, now: Timestamp) -> Result<u128> {
        let loan = self.loan(loan_id)?;
        let rate = clamp_pos_i128(self.current_rate());
        loan.interest_at_rate(rate, now).ok_or(ProtocolError::Overflow)
    }

    /// `repaid >= principal + interest_owed`
    pub fn is_settled(&self, loan_id: u64, now: Timestamp) -> Result<bool> {
        let loan = self.loan(loan_id)?;
        let owed = add_u128(loan.principal, self.interest_owed(loan_id, now)?);
        Ok(loan.repaid >= owed)
    }

    pub fn pending_events(&self) -> &[Event] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Raise `idle` to the pool account's real balance, booking the surplus
    /// as interest income. Returns the amount booked.
    pub fn accrue_interest(&mut self, tokens: &dyn TokenLedger) -> u128 {
        let actual = tokens.balance_of(&self.config.account);
        if actual <= self.idle {
            return 0;
        }
        let surplus = actual - self.idle;
        self.idle = actual;
        log::debug!("pool reconciled: +{} interest, total assets {}", surplus, self.total_assets());
        self.events.emit(Event::InterestAccrued {
            amount: surplus,
            total_assets: self.total_assets(),
        });
        surplus
    }

    // ========================================================================
    // LP operations
    // ========================================================================

    /// Deposit `amount` from `provider`; returns shares minted
    ///
    /// Pulls tokens with `transfer_from`, so the provider must have approved
    /// the pool account.
    pub fn deposit(
        &mut self,
        tokens: &mut dyn TokenLedger,
        provider: &Identity,
        amount: u128,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        self.accrue_interest(tokens);

        let minted = self.preview_deposit(amount)?;
        if minted == 0 {
            return Err(ProtocolError::InvalidAmount);
        }

        let account = self.config.account;
        tokens.transfer_from(&account, provider, &account, amount)?;

        self.idle = add_u128(self.idle, amount);
        self.total_shares = add_u128(self.total_shares, minted);
        let bal = self.shares.entry(*provider).or_insert(0);
        *bal = add_u128(*bal, minted);

        log::info!("deposit: {} assets from {} for {} shares", amount, provider, minted);
        self.events.emit(Event::Deposited {
            provider: *provider,
            amount,
            shares: minted,
        });
        Ok(minted)
    }

    /// Burn `shares` of `provider`; returns assets paid out
    pub fn withdraw(
        &mut self,
        tokens: &mut dyn TokenLedger,
        provider: &Identity,
        shares: u128,
    ) -> Result<u128> {
        if shares == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        self.accrue_interest(tokens);

        let held = self.shares_of(provider);
        if shares > held {
            return Err(ProtocolError::InsufficientShares);
        }

        let amount = self.preview_withdraw(shares)?;
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        // Lent-out principal backs the share price but cannot be paid out
        if amount > self.idle {
            return Err(ProtocolError::InsufficientLiquidity);
        }

        let account = self.config.account;
        tokens.transfer(&account, provider, amount)?;

        self.idle -= amount;
        self.total_shares = sub_u128(self.total_shares, shares);
        if held == shares {
            self.shares.remove(provider);
        } else {
            self.shares.insert(*provider, held - shares);
        }

        log::info!("withdraw: {} shares of {} for {} assets", shares, provider, amount);
        self.events.emit(Event::Withdrawn {
            provider: *provider,
            amount,
            shares,
        });
        Ok(amount)
    }

    /// Add `amount` from `donor` to the pool without minting shares
    pub fn donate(
        &mut self,
        tokens: &mut dyn TokenLedger,
        donor: &Identity,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        self.accrue_interest(tokens);

        let account = self.config.account;
        tokens.transfer(donor, &account, amount)?;
        self.accrue_interest(tokens);

        log::info!("donation: {} assets from {}", amount, donor);
        self.events.emit(Event::Donated {
            donor: *donor,
            amount,
        });
        Ok(())
    }

    // ========================================================================
    // Loans
    // ========================================================================

    /// Lend `amount` to the manager; returns the new loan id
    pub fn borrow(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        amount: u128,
        now: Timestamp,
    ) -> Result<u64> {
        if *caller != self.config.manager {
            log::warn!("borrow rejected: {} is not the pool manager", caller);
            return Err(ProtocolError::Unauthorized);
        }
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        self.accrue_interest(tokens);

        let account = self.config.account;
        if amount > tokens.balance_of(&account) || amount > self.idle {
            return Err(ProtocolError::InsufficientLiquidity);
        }

        tokens.transfer(&account, caller, amount)?;

        let loan_id = self.loans.len() as u64;
        self.loans.push(Loan::new(*caller, amount, now));
        self.idle -= amount;
        self.outstanding = add_u128(self.outstanding, amount);

        log::info!(
            "loan {} issued: {} to {}, utilization {}",
            loan_id,
            amount,
            caller,
            self.utilization()
        );
        self.events.emit(Event::Borrowed {
            loan_id,
            borrower: *caller,
            amount,
        });
        Ok(loan_id)
    }

    /// Repay `amount` on `loan_id` from `payer`
    ///
    /// Overpayment is accepted and stays in the pool as surplus.
    pub fn repay(
        &mut self,
        tokens: &mut dyn TokenLedger,
        payer: &Identity,
        loan_id: u64,
        amount: u128,
        now: Timestamp,
    ) -> Result<()> {
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        let index = usize::try_from(loan_id)
            .ok()
            .filter(|i| *i < self.loans.len())
            .ok_or(ProtocolError::InvalidLoan)?;
        if self.is_settled(loan_id, now)? {
            return Err(ProtocolError::AlreadySettled);
        }
        self.accrue_interest(tokens);

        let account = self.config.account;
        tokens.transfer(payer, &account, amount)?;

        let loan = &mut self.loans[index];
        let before = loan.outstanding_principal();
        loan.repaid = add_u128(loan.repaid, amount);
        let returned = before - loan.outstanding_principal();

        self.outstanding = sub_u128(self.outstanding, returned);
        self.idle = add_u128(self.idle, amount);

        log::info!("loan {} repaid {} by {}", loan_id, amount, payer);
        self.events.emit(Event::Repaid {
            loan_id,
            payer: *payer,
            amount,
        });
        Ok(())
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub fn set_manager(&mut self, caller: &Identity, manager: Identity) -> Result<()> {
        self.only_owner(caller)?;
        self.config.manager = manager;
        self.events.emit(Event::ManagerUpdated { manager });
        Ok(())
    }

    pub fn set_settlement_account(&mut self, caller: &Identity, account: Identity) -> Result<()> {
        self.only_owner(caller)?;
        self.config.settlement_account = account;
        Ok(())
    }

    pub fn set_rate_config(&mut self, caller: &Identity, rate: RateConfig) -> Result<()> {
        self.only_owner(caller)?;
        self.config.rate = rate;
        self.curve = RateCurve::new(rate);
        Ok(())
    }

    fn only_owner(&self, caller: &Identity) -> Result<()> {
        if *caller != self.config.owner {
            log::warn!("pool admin call rejected for {}", caller);
            return Err(ProtocolError::Unauthorized);
        }
        Ok(())
    }

    fn only_settlement_account(&self, caller: &Identity) -> Result<()> {
        if *caller != self.config.settlement_account {
            log::warn!("payout rejected: {} is not the settlement account", caller);
            return Err(ProtocolError::Unauthorized);
        }
        Ok(())
    }
}

impl LiquidityPool for LoanLedger {
    fn available_liquidity(&self, tokens: &dyn TokenLedger, caller: &Identity) -> Result<u128> {
        self.only_settlement_account(caller)?;
        // Reconciliation raises idle to the balance, so the balance binds
        Ok(tokens.balance_of(&self.config.account))
    }

    fn pay_out(
        &mut self,
        tokens: &mut dyn TokenLedger,
        caller: &Identity,
        to: &Identity,
        amount: u128,
    ) -> Result<()> {
        self.only_settlement_account(caller)?;
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        self.accrue_interest(tokens);

        let account = self.config.account;
        if amount > self.idle || amount > tokens.balance_of(&account) {
            return Err(ProtocolError::InsufficientLiquidity);
        }
        tokens.transfer(&account, to, amount)?;
        self.idle -= amount;

        log::info!("payout: {} to {}", amount, to);
        self.events.emit(Event::PaidOut { to: *to, amount });
        Ok(())
    }

    fn absorb_forfeit(
        &mut self,
        tokens: &mut dyn TokenLedger,
        from: &Identity,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount);
        }
        self.accrue_interest(tokens);

        let account = self.config.account;
        tokens.transfer(from, &account, amount)?;
        self.accrue_interest(tokens);

        self.events.emit(Event::ForfeitAbsorbed { from: *from, amount });
        Ok(())
    }
}
