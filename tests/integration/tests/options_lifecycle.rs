//! Position lifecycle against the real pool, signed with Ed25519 keys

use strike_common::{
    identity_of, sign_digest, Event, HookPayload, Identity, OrderRef, ProtocolError, TokenLedger,
};
use strike_integration_tests::*;
use strike_options::{OptionType, PermitArgs, PositionStatus};

const LP: Identity = Identity([50; 32]);

fn world() -> World {
    let mut world = World::new();
    world.seed_liquidity(&LP, 100_000);
    world
}

#[test]
fn test_high_low_call_wins_after_expiry() {
    let mut world = world();
    let (signer, user) = world.funded_user(10, 5_000);
    let id = world.open(&signer, high_low(true, 100), START).unwrap();

    let expiry = START + LIFETIME;
    let oracle = world.oracle_price(101, expiry - 10);
    let won = world
        .engine
        .settle(&mut world.token, &id, &oracle, expiry + 1)
        .unwrap();

    assert!(won);
    assert_eq!(world.engine.position(&id).unwrap().status, PositionStatus::Won);
    assert_eq!(world.token.balance_of(&user), 5_000 - COLLATERAL + PAYOUT);
    // Pool kept the stake and paid the gross payout
    assert_eq!(world.total_assets(), 100_000 + COLLATERAL - PAYOUT);
}

#[test]
fn test_win_refused_by_pool_moves_no_funds() {
    let mut world = world();
    let (signer, user) = world.funded_user(21, 5_000);
    let id = world.open(&signer, high_low(true, 100), START).unwrap();

    // Pool no longer recognises the custody account as its settler
    let owner = world.owner;
    world
        .pool
        .enter(|p| p.set_settlement_account(&owner, Identity([99; 32])))
        .unwrap();

    let custody = world.custody;
    let pool_account = world.pool_account;
    let oracle = world.oracle_price(101, START + 10);
    assert_eq!(
        world
            .engine
            .settle(&mut world.token, &id, &oracle, START + LIFETIME + 1),
        Err(ProtocolError::Unauthorized)
    );

    assert!(world.engine.position(&id).unwrap().is_active());
    assert_eq!(world.token.balance_of(&custody), COLLATERAL);
    assert_eq!(world.token.balance_of(&pool_account), 100_000);
    assert_eq!(world.total_assets(), 100_000);

    // The stake is still there for the refund
    let refund = world
        .engine
        .expire(&mut world.token, &id, START + LIFETIME + 1)
        .unwrap();
    assert_eq!(world.token.balance_of(&user), 5_000 - COLLATERAL + refund);
}

#[test]
fn test_boundary_inside_wins_outside_loses() {
    let mut world = world();
    let (signer, user) = world.funded_user(11, 5_000);

    let inside = world.open(&signer, range(OptionType::Boundary, 90, 110), START).unwrap();
    let outside = world.open(&signer, range(OptionType::Boundary, 90, 110), START).unwrap();
    assert_ne!(inside, outside);

    let expiry = START + LIFETIME;
    let p95 = world.oracle_price(95, START + 100);
    let p111 = world.oracle_price(111, START + 100);

    assert_eq!(world.engine.settle(&mut world.token, &inside, &p95, expiry + 1), Ok(true));
    assert_eq!(world.engine.settle(&mut world.token, &outside, &p111, expiry + 1), Ok(false));

    assert_eq!(
        world.engine.position(&outside).unwrap().status,
        PositionStatus::Lost
    );
    assert_eq!(world.token.balance_of(&user), 5_000 - 2 * COLLATERAL + PAYOUT);
    assert_eq!(world.engine.positions().positions_of(&user).len(), 2);
}

#[test]
fn test_expire_refunds_99_5_percent() {
    let mut world = world();
    let (signer, user) = world.funded_user(12, 5_000);
    let id = world.open(&signer, high_low(false, 100), START).unwrap();

    let before = world.total_assets();
    let refund = world
        .engine
        .expire(&mut world.token, &id, START + LIFETIME + 1)
        .unwrap();

    assert_eq!(refund, 995);
    assert_eq!(world.token.balance_of(&user), 5_000 - 5);
    assert_eq!(world.total_assets(), before + 5);
    assert_eq!(world.engine.position(&id).unwrap().status, PositionStatus::Expired);

    let events = world.engine.drain_events();
    assert!(events.contains(&Event::PositionSettled {
        id,
        won: false,
        payout: 0,
    }));
}

#[test]
fn test_second_resolution_fails() {
    let mut world = world();
    let (signer, _) = world.funded_user(13, 5_000);
    let id = world.open(&signer, high_low(true, 100), START).unwrap();
    let after = START + LIFETIME + 1;

    world.engine.expire(&mut world.token, &id, after).unwrap();

    let oracle = world.oracle_price(150, START + 10);
    assert_eq!(
        world.engine.settle(&mut world.token, &id, &oracle, after),
        Err(ProtocolError::NotActive)
    );
    assert_eq!(
        world.engine.expire(&mut world.token, &id, after),
        Err(ProtocolError::NotActive)
    );
}

#[test]
fn test_replayed_signed_request_rejected() {
    let mut world = world();
    let (signer, user) = world.funded_user(14, 5_000);
    let request = world.request(&user, high_low(true, 100), START);
    let signature = world.sign(&signer, &request);
    let operator = world.operator;

    world
        .engine
        .open_position(&mut world.token, &operator, &request, &signature, START)
        .unwrap();
    assert_eq!(
        world
            .engine
            .open_position(&mut world.token, &operator, &request, &signature, START),
        Err(ProtocolError::InvalidNonce)
    );
    assert_eq!(world.engine.nonce_of(&user), 1);
}

#[test]
fn test_request_signed_by_another_key_rejected() {
    let mut world = world();
    let (_, user) = world.funded_user(15, 5_000);
    let request = world.request(&user, high_low(true, 100), START);
    let signature = world.sign(&key(16), &request);
    let operator = world.operator;

    assert_eq!(
        world
            .engine
            .open_position(&mut world.token, &operator, &request, &signature, START),
        Err(ProtocolError::InvalidSignature)
    );
    assert_eq!(world.token.balance_of(&user), 5_000);
}

#[test]
fn test_oracle_signed_under_other_domain_rejected() {
    let mut world = world();
    let (signer, _) = world.funded_user(17, 5_000);
    let id = world.open(&signer, high_low(true, 100), START).unwrap();

    let mut foreign = world.domain.clone();
    foreign.chain_id += 1;
    let data = strike_common::OraclePrice {
        price: 150,
        timestamp: START + 10,
    };
    let oracle = strike_common::SignedPrice {
        data,
        signature: sign_digest(&world.oracle_key, &data.digest(&foreign)),
    };

    assert_eq!(
        world
            .engine
            .settle(&mut world.token, &id, &oracle, START + LIFETIME + 1),
        Err(ProtocolError::InvalidOracleSignature)
    );
}

#[test]
fn test_hook_loss_forfeits_and_cancels_order() {
    let mut world = world();
    let (signer, _) = world.funded_user(18, 5_000);
    let id = world.open(&signer, high_low(true, 100), START).unwrap();
    let order_ref = world.engine.position(&id).unwrap().order_ref;

    let payload = HookPayload {
        position_id: id,
        oracle: world.oracle_price(100, START + 200),
    }
    .encode();

    let book = world.order_book;
    let before = world.total_assets();
    let won = world
        .engine
        .pre_transfer_hook(&mut world.token, &book, &order_ref, &payload, START + LIFETIME + 1)
        .unwrap();

    assert!(!won);
    assert_eq!(world.engine.order_book().cancelled, vec![order_ref]);
    assert_eq!(world.total_assets(), before + COLLATERAL);
}

#[test]
fn test_hook_rejects_foreign_order() {
    let mut world = world();
    let (signer, _) = world.funded_user(19, 5_000);
    let id = world.open(&signer, high_low(true, 100), START).unwrap();
    let payload = HookPayload {
        position_id: id,
        oracle: world.oracle_price(100, START + 200),
    }
    .encode();

    let book = world.order_book;
    assert_eq!(
        world.engine.pre_transfer_hook(
            &mut world.token,
            &book,
            &OrderRef::new([0; 32]),
            &payload,
            START + LIFETIME + 1
        ),
        Err(ProtocolError::OrderMismatch)
    );
}

#[test]
fn test_open_with_permit_real_signatures() {
    let mut world = world();
    let signer = key(30);
    let user = identity_of(&signer);
    world.token.mint(&user, 2_000);

    let request = world.request(&user, high_low(true, 100), START);
    let signature = world.sign(&signer, &request);
    let deadline = START + 60;
    let custody = world.custody;
    let permit_digest = world
        .token
        .permit_digest(&user, &custody, COLLATERAL, deadline);
    let permit = PermitArgs {
        amount: COLLATERAL,
        deadline,
        signature: sign_digest(&signer, &permit_digest),
    };

    let operator = world.operator;
    let id = world
        .engine
        .open_position_with_permit(&mut world.token, &operator, &request, &signature, &permit, START)
        .unwrap();

    assert_eq!(world.token.balance_of(&user), 1_000);
    assert_eq!(world.token.permit_nonce(&user), 1);
    assert!(world.engine.position(&id).unwrap().is_active());
}

#[test]
fn test_lp_absorbs_losses_of_option_buyers() {
    let mut world = world();
    let (signer, _) = world.funded_user(20, 10_000);
    let share_price_before = world.pool.view(|p| p.share_price()).unwrap();

    let ids: Vec<_> = (0..3)
        .map(|_| world.open(&signer, high_low(true, 100), START).unwrap())
        .collect();
    let oracle = world.oracle_price(90, START + 500);
    for id in &ids {
        assert_eq!(
            world
                .engine
                .settle(&mut world.token, id, &oracle, START + LIFETIME + 1),
            Ok(false)
        );
    }

    let share_price_after = world.pool.view(|p| p.share_price()).unwrap();
    assert!(share_price_after > share_price_before);
    assert_eq!(world.total_assets(), 100_000 + 3 * COLLATERAL);
}

#[test]
fn test_admin_changes_are_journaled() {
    let mut world = world();
    let owner = world.owner;
    let operator = world.operator;
    let new_oracle = identity_of(&key(201));

    assert_eq!(
        world.engine.set_oracle(&operator, new_oracle),
        Err(ProtocolError::Unauthorized)
    );
    world.engine.set_oracle(&owner, new_oracle).unwrap();
    world.engine.set_min_settlement_delay(&owner, 600).unwrap();
    assert_eq!(world.engine.set_fee_bps(&owner, 501), Err(ProtocolError::FeeTooHigh));

    let events = world.engine.drain_events();
    assert_eq!(
        events,
        vec![
            Event::OracleUpdated { oracle: new_oracle },
            Event::SettlementDelayUpdated { secs: 600 },
        ]
    );
    let json = serde_json::to_string(&events[1]).unwrap();
    assert_eq!(json, r#"{"event":"settlement_delay_updated","secs":600}"#);
}
