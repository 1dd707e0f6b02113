//! Pool accounting scenarios against the guarded ledger

use model_safety::math::{SECONDS_PER_YEAR, WAD};
use strike_common::{Event, Identity, LiquidityPool, ProtocolError, TokenLedger};
use strike_integration_tests::*;

const LP: Identity = Identity([50; 32]);
const LP2: Identity = Identity([51; 32]);

#[test]
fn test_deposit_withdraw_scenario() {
    let mut world = World::new();

    let minted = world.seed_liquidity(&LP, 1_000);
    assert_eq!(minted, 1_000);

    let token = &mut world.token;
    let out = world.pool.enter(|p| p.withdraw(token, &LP, 500)).unwrap();
    assert_eq!(out, 500);

    let (assets, shares) = world
        .pool
        .view(|p| (p.total_assets(), p.total_shares()))
        .unwrap();
    assert_eq!((assets, shares), (500, 500));
    assert_eq!(world.token.balance_of(&LP), 500);
}

#[test]
fn test_interest_matches_closed_form() {
    let mut world = World::new();
    world.seed_liquidity(&LP, 1_000_000 * WAD);

    let manager = world.manager;
    let token = &mut world.token;
    let loan = world
        .pool
        .enter(|p| p.borrow(token, &manager, 1_000 * WAD, START))
        .unwrap();

    // Utilization 0.1%: 5% + 5% * 0.001 annual
    let rate = world.pool.view(|p| p.current_rate()).unwrap() as u128;
    let expected_annual = 5 * WAD / 100 + 5 * WAD / 100 / 1_000;
    assert_eq!(rate, expected_annual / SECONDS_PER_YEAR);

    let elapsed = SECONDS_PER_YEAR as u64;
    let owed = world
        .pool
        .view(|p| p.interest_owed(loan, START + elapsed))
        .unwrap()
        .unwrap();

    // 1000 * ~5.005% over a year, truncated per second
    let closed_form = 1_000 * WAD * expected_annual / WAD;
    let tolerance = 1_000 * SECONDS_PER_YEAR; // one unit of rate truncation per second
    assert!(owed <= closed_form);
    assert!(closed_form - owed <= tolerance, "owed {} vs {}", owed, closed_form);
    println!("interest owed after one year: {} (closed form {})", owed, closed_form);
}

#[test]
fn test_partial_repay_keeps_loan_open() {
    let mut world = World::new();
    world.seed_liquidity(&LP, 100_000);

    let manager = world.manager;
    world.token.mint(&manager, 10_000);
    let token = &mut world.token;
    let loan = world
        .pool
        .enter(|p| p.borrow(token, &manager, 10_000, START))
        .unwrap();

    let later = START + 30 * 24 * 3_600;
    let token = &mut world.token;
    world
        .pool
        .enter(|p| p.repay(token, &manager, loan, 10_000, later))
        .unwrap();

    // Principal is back but a month of interest is not
    let settled = world.pool.view(|p| p.is_settled(loan, later)).unwrap().unwrap();
    assert!(!settled);

    let owed = world.pool.view(|p| p.interest_owed(loan, later)).unwrap().unwrap();
    assert!(owed > 0);
    let token = &mut world.token;
    world
        .pool
        .enter(|p| p.repay(token, &manager, loan, owed, later))
        .unwrap();

    let token = &mut world.token;
    assert_eq!(
        world.pool.enter(|p| p.repay(token, &manager, loan, 1, later)),
        Err(ProtocolError::AlreadySettled)
    );
    assert_eq!(world.total_assets(), 100_000 + owed);
}

#[test]
fn test_interest_income_lifts_share_price_for_existing_lps() {
    let mut world = World::new();
    world.seed_liquidity(&LP, 10_000);

    // Yield lands in the pool account outside any operation
    let pool_account = world.pool_account;
    world.token.mint(&pool_account, 1_000);

    let minted = world.seed_liquidity(&LP2, 11_000);
    assert_eq!(minted, 10_000);

    let token = &mut world.token;
    let out = world.pool.enter(|p| p.withdraw(token, &LP, 10_000)).unwrap();
    assert_eq!(out, 11_000);

    let events = world.pool.enter(|p| Ok(p.drain_events())).unwrap();
    assert!(events.contains(&Event::InterestAccrued {
        amount: 1_000,
        total_assets: 11_000,
    }));
}

#[test]
fn test_only_settlement_account_draws_payouts() {
    let mut world = World::new();
    world.seed_liquidity(&LP, 10_000);

    let mut pool = world.pool.clone();
    let stranger = Identity([99; 32]);
    assert_eq!(
        pool.pay_out(&mut world.token, &stranger, &stranger, 100),
        Err(ProtocolError::Unauthorized)
    );

    let custody = world.custody;
    pool.pay_out(&mut world.token, &custody, &stranger, 100).unwrap();
    assert_eq!(world.token.balance_of(&stranger), 100);
}
