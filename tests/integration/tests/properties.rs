//! Property tests over the composed pool and engine

use model_safety::helpers::assets_per_share_non_decreasing;
use proptest::prelude::*;
use strike_common::{Identity, Timestamp};
use strike_integration_tests::*;
use strike_options::{OptionType, PositionStatus, Terms};

#[derive(Clone, Debug)]
enum PoolOp {
    Deposit { lp: u8, amount: u128 },
    Withdraw { lp: u8, percent: u128 },
    Donate { amount: u128 },
    Yield { amount: u128 },
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        (0u8..3, 1u128..1_000_000).prop_map(|(lp, amount)| PoolOp::Deposit { lp, amount }),
        (0u8..3, 1u128..=100).prop_map(|(lp, percent)| PoolOp::Withdraw { lp, percent }),
        (1u128..10_000).prop_map(|amount| PoolOp::Donate { amount }),
        (1u128..10_000).prop_map(|amount| PoolOp::Yield { amount }),
    ]
}

fn lp(i: u8) -> Identity {
    Identity::new([60 + i; 32])
}

const DONOR: Identity = Identity([70; 32]);

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_share_price_never_drops(ops in prop::collection::vec(pool_op(), 1..40)) {
        let mut world = World::new();
        let pool_account = world.pool_account;
        for i in 0..3 {
            world.token.mint(&lp(i), 100_000_000);
            world.token.approve(&lp(i), &pool_account, u128::MAX);
        }
        world.token.mint(&DONOR, 100_000_000);

        for op in ops {
            let before = world.pool.view(|p| p.snapshot()).unwrap();
            let token = &mut world.token;
            // Rejected operations are fine, they must just leave no leak
            let _ = match op {
                PoolOp::Deposit { lp: i, amount } => {
                    world.pool.enter(|p| p.deposit(token, &lp(i), amount)).map(|_| ())
                }
                PoolOp::Withdraw { lp: i, percent } => {
                    let held = world.pool.view(|p| p.shares_of(&lp(i))).unwrap();
                    let shares = held * percent / 100;
                    world.pool.enter(|p| p.withdraw(token, &lp(i), shares)).map(|_| ())
                }
                PoolOp::Donate { amount } => {
                    world.pool.enter(|p| p.donate(token, &DONOR, amount))
                }
                PoolOp::Yield { amount } => {
                    token.mint(&pool_account, amount);
                    Ok(())
                }
            };
            let after = world.pool.view(|p| p.snapshot()).unwrap();
            prop_assert!(
                assets_per_share_non_decreasing(&before, &after),
                "{:?} -> {:?}", before, after
            );
        }
    }

    #[test]
    fn prop_interest_owed_grows_with_time(
        principal in 1u128..1_000_000_000_000,
        t1 in 0u64..100_000_000,
        dt in 0u64..100_000_000,
    ) {
        let mut world = World::new();
        world.seed_liquidity(&lp(0), 1_000_000_000_000);
        let manager = world.manager;
        let token = &mut world.token;
        let loan = world.pool.enter(|p| p.borrow(token, &manager, principal, START)).unwrap();

        let early = world.pool.view(|p| p.interest_owed(loan, START + t1)).unwrap().unwrap();
        let late = world.pool.view(|p| p.interest_owed(loan, START + t1 + dt)).unwrap().unwrap();
        prop_assert!(late >= early);
        prop_assert_eq!(
            world.pool.view(|p| p.interest_owed(loan, START)).unwrap().unwrap(),
            0
        );
    }

    #[test]
    fn prop_win_table(
        strike in 1u128..1_000_000,
        lower in 1u128..1_000_000,
        width in 0u128..1_000_000,
        price in 0u128..3_000_000,
    ) {
        let upper = lower + width;

        let call = high_low(true, strike);
        let put = high_low(false, strike);
        prop_assert_eq!(call.wins(price), price > strike);
        prop_assert_eq!(put.wins(price), price < strike);
        prop_assert!(!(call.wins(strike) || put.wins(strike)));

        let inside = lower <= price && price <= upper;
        let boundary = range(OptionType::Boundary, lower, upper);
        let out_of_bounds = range(OptionType::OutOfBounds, lower, upper);
        prop_assert_eq!(boundary.wins(price), inside);
        prop_assert_eq!(out_of_bounds.wins(price), !inside);
        for is_call in [true, false] {
            prop_assert_eq!(Terms { is_call, ..boundary }.wins(price), inside);
        }

        let touch = Terms { option_type: OptionType::OneTouch, ..call };
        let no_touch = Terms { option_type: OptionType::NoTouch, ..call };
        prop_assert!(touch.wins(strike));
        prop_assert_eq!(touch.wins(price), price >= strike);
        prop_assert_eq!(no_touch.wins(price), price < strike);
    }

    #[test]
    fn prop_one_transition_out_of_active(
        attempts in prop::collection::vec((0u8..3, 90u128..110), 1..8),
    ) {
        let mut world = World::new();
        world.seed_liquidity(&lp(0), 1_000_000);
        let (signer, _) = world.funded_user(80, 10_000);
        let id = world.open(&signer, high_low(true, 100), START).unwrap();
        let operator = world.operator;
        let after: Timestamp = START + LIFETIME + 1;

        let mut resolved = None;
        for (kind, price) in attempts {
            let oracle = world.oracle_price(price, START + 1);
            let outcome = match kind {
                0 => world.engine.settle(&mut world.token, &id, &oracle, after).map(|_| ()),
                1 => world.engine.expire(&mut world.token, &id, after).map(|_| ()),
                _ => world.engine.cancel_position(&mut world.token, &operator, &id).map(|_| ()),
            };
            let status = world.engine.position(&id).unwrap().status;
            match (resolved, outcome) {
                (None, Ok(())) => {
                    prop_assert!(status.is_terminal());
                    resolved = Some(status);
                }
                (None, Err(e)) => prop_assert!(false, "first resolution failed: {:?}", e),
                (Some(first), result) => {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(status, first);
                }
            }
        }
        prop_assert_ne!(resolved, Some(PositionStatus::Active));
    }
}
