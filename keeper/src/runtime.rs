//! In-process engine the journal is replayed against
//!
//! Commands execute at their journal time; the clock never moves backwards.
//! After each command every tracked position past expiry is expired, so a
//! settlement recorded at the same instant wins over the keeper.

use crate::config::Config;
use crate::expiry_queue::{ExpiryQueue, TrackedPosition};
use crate::health::PoolReport;
use crate::journal::{Command, Entry};
use strike_common::{
    Ed25519Verifier, Event, Guarded, MemoryToken, OrderBook, OrderRef, ProtocolError, Result,
    Timestamp,
};
use strike_options::{OptionType, SettlementEngine};
use strike_pool::LoanLedger;

pub type Pool = Guarded<LoanLedger>;
pub type Engine = SettlementEngine<Pool, JournalOrderBook, Ed25519Verifier>;

/// Order venue stand-in: records the orders the engine cancels
#[derive(Debug, Default)]
pub struct JournalOrderBook {
    cancelled: Vec<OrderRef>,
}

impl JournalOrderBook {
    pub fn cancelled(&self) -> &[OrderRef] {
        &self.cancelled
    }
}

impl OrderBook for JournalOrderBook {
    fn cancel_order(&mut self, _metadata: &[u8], order_ref: &OrderRef) -> Result<()> {
        log::info!("order {} cancelled", order_ref);
        self.cancelled.push(*order_ref);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub applied: usize,
    pub rejected: usize,
    pub expired: usize,
}

pub struct Keeper {
    token: MemoryToken,
    pool: Pool,
    engine: Engine,
    queue: ExpiryQueue,
    clock: Timestamp,
    max_batch: usize,
    alert: u128,
    last_report: Option<PoolReport>,
    stats: Stats,
}

impl Keeper {
    pub fn new(config: &Config) -> Self {
        let pool = Guarded::new(LoanLedger::new(config.pool.clone()));
        let engine = SettlementEngine::new(
            config.engine.clone(),
            Ed25519Verifier,
            pool.clone(),
            JournalOrderBook::default(),
        );
        Self {
            token: MemoryToken::new(config.engine.domain.clone()),
            pool,
            engine,
            queue: ExpiryQueue::new(),
            clock: 0,
            max_batch: config.max_expirations_per_batch.max(1),
            alert: config.utilization_alert as u128,
            last_report: None,
            stats: Stats::default(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn token(&self) -> &MemoryToken {
        &self.token
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn queue(&self) -> &ExpiryQueue {
        &self.queue
    }

    /// Run one journal entry, then the expirations it makes due
    ///
    /// Returns every event recorded along the way. A rejected command is
    /// logged and counted; it never stops the replay.
    pub fn apply(&mut self, entry: Entry) -> Vec<Event> {
        if entry.at < self.clock {
            log::warn!(
                "journal entry at {} is behind the clock ({}), running it at {}",
                entry.at,
                self.clock,
                self.clock
            );
        }
        self.clock = self.clock.max(entry.at);

        match self.execute(entry.command) {
            Ok(()) => self.stats.applied += 1,
            Err(e) => {
                self.stats.rejected += 1;
                log::warn!("command at {} rejected: {}", self.clock, e);
            }
        }

        let mut events = self.collect_events();
        self.run_expirations();
        events.extend(self.collect_events());
        events
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        let now = self.clock;
        let token = &mut self.token;
        match command {
            Command::Mint { to, amount } => {
                token.mint(&to, amount);
                Ok(())
            }
            Command::Approve {
                owner,
                spender,
                amount,
            } => {
                token.approve(&owner, &spender, amount);
                Ok(())
            }
            Command::Deposit { provider, amount } => self
                .pool
                .enter(|p| p.deposit(token, &provider, amount))
                .map(|_| ()),
            Command::Withdraw { provider, shares } => self
                .pool
                .enter(|p| p.withdraw(token, &provider, shares))
                .map(|_| ()),
            Command::Donate { donor, amount } => {
                self.pool.enter(|p| p.donate(token, &donor, amount))
            }
            Command::Borrow { caller, amount } => self
                .pool
                .enter(|p| p.borrow(token, &caller, amount, now))
                .map(|_| ()),
            Command::Repay {
                payer,
                loan_id,
                amount,
            } => self
                .pool
                .enter(|p| p.repay(token, &payer, loan_id, amount, now)),
            Command::Open {
                caller,
                request,
                signature,
                permit,
            } => match permit {
                Some(permit) => self
                    .engine
                    .open_position_with_permit(token, &caller, &request, &signature, &permit, now)
                    .map(|_| ()),
                None => self
                    .engine
                    .open_position(token, &caller, &request, &signature, now)
                    .map(|_| ()),
            },
            Command::Settle { id, oracle } => {
                self.engine.settle(token, &id, &oracle, now).map(|_| ())
            }
            Command::Hook {
                caller,
                order_ref,
                extra_data,
            } => {
                let payload = bs58::decode(&extra_data)
                    .into_vec()
                    .map_err(|_| ProtocolError::MalformedPayload)?;
                self.engine
                    .pre_transfer_hook(token, &caller, &order_ref, &payload, now)
                    .map(|_| ())
            }
            Command::Expire { id } => self.engine.expire(token, &id, now).map(|_| ()),
            Command::Cancel { caller, id } => {
                self.engine.cancel_position(token, &caller, &id).map(|_| ())
            }
            Command::Tick => Ok(()),
        }
    }

    /// Expire every tracked position past expiry, in batches
    ///
    /// A position that fails to expire goes back on the queue and is tried
    /// again after the next command, unless it is already resolved.
    pub fn run_expirations(&mut self) -> usize {
        let mut expired = 0;
        let mut retry = Vec::new();
        loop {
            let due = self.queue.pop_due(self.clock, self.max_batch);
            if due.is_empty() {
                break;
            }
            for position in due {
                match self.engine.expire(&mut self.token, &position.id, self.clock) {
                    Ok(refund) => {
                        expired += 1;
                        log::info!(
                            "expired position {} of {}: refund {}",
                            position.id,
                            position.user,
                            refund
                        );
                    }
                    Err(ProtocolError::NotActive | ProtocolError::UnknownPosition) => {
                        log::debug!("position {} already resolved", position.id);
                    }
                    Err(e) => {
                        log::warn!("could not expire position {}, will retry: {}", position.id, e);
                        retry.push(position);
                    }
                }
            }
        }
        for position in retry {
            self.queue.push(position);
        }
        self.stats.expired += expired;
        expired
    }

    /// Drain both ledgers' journals and keep the expiry queue in step
    fn collect_events(&mut self) -> Vec<Event> {
        let mut events = self.pool.enter(|p| Ok(p.drain_events())).unwrap_or_default();
        events.extend(self.engine.drain_events());

        for event in &events {
            match event {
                Event::PositionOpened {
                    id,
                    user,
                    option_type,
                    collateral,
                    expiry,
                    ..
                } => {
                    match OptionType::from_ordinal(*option_type) {
                        Some(kind) => log::debug!("tracking {:?} position {} until {}", kind, id, expiry),
                        None => log::warn!("position {} has unknown option type {}", id, option_type),
                    }
                    self.queue.push(TrackedPosition {
                        id: *id,
                        user: *user,
                        collateral: *collateral,
                        expiry: *expiry,
                    });
                }
                Event::PositionSettled { id, .. } | Event::PositionCancelled { id, .. } => {
                    self.queue.remove(id);
                }
                _ => {}
            }
        }
        events
    }

    /// Capture and log a health report, warning on share-price leaks
    pub fn report(&mut self) -> Result<PoolReport> {
        let report = self.pool.view(PoolReport::capture)?;
        report.log(self.alert);
        if let Some(previous) = &self.last_report {
            if report.leaked_since(previous) {
                log::warn!(
                    "assets per share fell from {} to {}",
                    previous.share_price,
                    report.share_price
                );
            }
        }
        log::info!(
            "positions: {} tracked, {} collateral locked",
            self.queue.len(),
            self.queue.total_collateral()
        );
        self.last_report = Some(report);
        Ok(report)
    }
}
