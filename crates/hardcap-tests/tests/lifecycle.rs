//! End-to-end lifecycle tests.
//!
//! Each test runs a sale from deployment to finalization over the in-memory
//! ledger, moving the manual clock through the assignment window, the
//! public window, the extension and the close.

use hardcap_core::constants::{DEFAULT_GRACE_PERIOD_SECS, ETHER, TOKEN};
use hardcap_core::error::{
    AmountError, AuthorizationError, LedgerError, SaleError, StateError, WindowError,
};
use hardcap_core::ledger::MemoryCreditLedger;
use hardcap_core::traits::CreditLedger;
use hardcap_core::types::Address;
use hardcap_sale::{Crowdsale, SaleSnapshot};
use hardcap_tests::helpers::*;

// ---------------------------------------------------------------------------
// Full lifecycle
// ---------------------------------------------------------------------------

#[test]
fn e2e_assign_buy_extend_finalize() {
    let (mut sale, clock) = sale();
    let initial_close = sale.closing_time();

    // Private round before the public opening.
    clock.set(ASSIGN_OPENING + 10);
    assert!(matches!(
        sale.receive_payment(investor(1), ETHER),
        Err(SaleError::Window(WindowError::NotOpenYet { .. }))
    ));
    assert_eq!(
        sale.assign(investor(9), investor(9), TOKEN),
        Err(AuthorizationError::NotAssigner(investor(9)).into())
    );
    let r = sale.assign(ASSIGNER, investor(1), 50_000_000 * TOKEN).unwrap();
    assert_eq!(r.phase, 0);
    assert_eq!(sale.wei_raised(), 0);

    // Public round: 7.5M tokens left in the first wave.
    clock.set(OPENING);
    let r = sale.receive_payment(investor(2), ETHER).unwrap();
    assert_eq!(r.tokens, 11_500 * TOKEN);
    assert_eq!(r.forwarded_to, TREASURY);

    // Batch pushes into the second wave.
    sale.assign_batch(
        ASSIGNER,
        &[investor(3), investor(4)],
        &[5_000_000 * TOKEN, 5_000_000 * TOKEN],
    )
    .unwrap();
    assert_eq!(sale.phase(), 1);
    assert_eq!(sale.current_rate(), 11_000);

    // Late purchase that crosses 112.5M opens the extension.
    let late = initial_close - 3_600;
    clock.set(late);
    let r = sale.receive_payment(investor(5), 5_000 * ETHER).unwrap();
    assert!(r.phase >= 2);
    assert_eq!(r.extended_to, Some(late + DEFAULT_GRACE_PERIOD_SECS));
    assert_eq!(sale.closing_time(), late + DEFAULT_GRACE_PERIOD_SECS);

    // Still open past the original close.
    clock.set(initial_close + 1);
    assert!(sale.is_open());
    sale.receive_payment(investor(6), 10 * ETHER).unwrap();

    // Not finalizable until the extended close.
    sale.set_reserve_holder(OPERATOR, RESERVE).unwrap();
    assert!(matches!(
        sale.finalize(investor(7)),
        Err(SaleError::State(StateError::NotFinalizable { .. }))
    ));

    clock.set(sale.closing_time());
    assert!(!sale.is_open());
    let sold = sale.total_allocated();
    let f = sale.finalize(investor(7)).unwrap();
    assert_eq!(f.split.sold, sold);
    assert_eq!(f.burned, 0);

    let ledger = sale.ledger();
    assert_eq!(ledger.total_supply(), f.split.minted_total());
    assert_eq!(ledger.balance_of(&RESERVE), f.split.team);
    assert_eq!(ledger.balance_of(&PLATFORM), f.split.platform);
    assert_eq!(ledger.owner(), TREASURY);
    assert!(ledger.minting_finished());

    // The sale is closed for good; holders can now move tokens.
    assert_eq!(sale.finalize(OPERATOR), Err(StateError::AlreadyFinalized.into()));
    let mut ledger = sale.into_ledger();
    ledger.transfer(&investor(2), investor(8), TOKEN).unwrap();
    assert_eq!(ledger.balance_of(&investor(8)), TOKEN);
}

#[test]
fn transfers_locked_during_sale() {
    let (mut sale, _) = sale();
    sale.receive_payment(investor(1), ETHER).unwrap();
    let mut ledger = sale.into_ledger();
    assert_eq!(
        ledger.transfer(&investor(1), investor(2), TOKEN),
        Err(LedgerError::TransfersDisabled)
    );
}

// ---------------------------------------------------------------------------
// Cap and overflow
// ---------------------------------------------------------------------------

#[test]
fn overflow_goes_to_last_purchaser() {
    let (mut sale, _) = sale();
    sale.receive_payment(investor(1), 20_000 * ETHER).unwrap();
    assert_eq!(sale.overflow_owner(), Address::ZERO);

    let r = sale.receive_payment(investor(2), 5_000 * ETHER).unwrap();
    assert_eq!(r.tokens, sale.rate_table().cap() - sale.ledger().balance_of(&investor(1)));
    assert_eq!(sale.overflow_owner(), investor(2));
    assert_eq!(sale.overflow_amount(), 1_500 * ETHER);
    assert_eq!(sale.wei_raised(), 23_500 * ETHER);
    assert_eq!(sale.ledger().total_supply(), sale.rate_table().cap());

    assert_eq!(sale.receive_payment(investor(3), ETHER), Err(AmountError::SoldOut.into()));
    assert_eq!(sale.assign(ASSIGNER, investor(3), TOKEN), Err(AmountError::SoldOut.into()));
}

#[test]
fn sold_out_finalizes_early() {
    let (mut sale, _) = sale();
    sale.receive_payment(investor(1), 30_000 * ETHER).unwrap();
    sale.set_reserve_holder(OPERATOR, RESERVE).unwrap();
    let f = sale.finalize(investor(1)).unwrap();
    assert_eq!(f.finalized_at, OPENING);
    assert_eq!(f.split.sold, 250_000_000 * TOKEN);
}

#[test]
fn nothing_sold_burns_premint() {
    let premint = 450_000_000 * TOKEN;
    let mut ledger = MemoryCreditLedger::new(SALE);
    ledger.mint(&SALE, SALE, premint).unwrap();
    let (mut sale, clock) = sale_over(config(), ledger);
    sale.set_reserve_holder(OPERATOR, RESERVE).unwrap();
    clock.set(sale.closing_time());

    let f = sale.finalize(investor(1)).unwrap();
    assert_eq!(f.split.sold, 0);
    assert_eq!(f.split.minted_total(), 0);
    assert_eq!(f.burned, premint);
    assert_eq!(sale.ledger().balance_of(&SALE), 0);
    assert_eq!(sale.ledger().total_supply(), 0);
    assert!(sale.ledger().minting_finished());
    assert_eq!(sale.ledger().owner(), TREASURY);
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[test]
fn batch_failure_changes_nothing() {
    let (mut sale, _) = sale();
    sale.assign(ASSIGNER, investor(1), 200_000_000 * TOKEN).unwrap();
    let before = sale.snapshot();
    let supply = sale.ledger().total_supply();

    let err = sale
        .assign_batch(ASSIGNER, &[investor(2), investor(3)], &[40_000_000 * TOKEN, 20_000_000 * TOKEN])
        .unwrap_err();
    assert!(matches!(err, SaleError::Amount(AmountError::BatchExceedsCapacity { .. })));
    assert_eq!(sale.snapshot(), before);
    assert_eq!(sale.ledger().total_supply(), supply);

    assert_eq!(
        sale.assign_batch(ASSIGNER, &[investor(2)], &[0]),
        Err(AmountError::ZeroAmount.into())
    );
    assert_eq!(sale.snapshot(), before);
}

#[test]
fn ledger_rejection_rolls_back_batch() {
    let ledger = MemoryCreditLedger::new(SALE).with_mint_ceiling(10 * TOKEN);
    let (mut sale, _) = sale_over(config(), ledger);
    let before = sale.snapshot();
    let err = sale
        .assign_batch(ASSIGNER, &[investor(1), investor(2)], &[6 * TOKEN, 6 * TOKEN])
        .unwrap_err();
    assert!(matches!(err, SaleError::Ledger(LedgerError::CeilingExceeded { .. })));
    assert_eq!(sale.snapshot(), before);
    assert_eq!(sale.ledger().balance_of(&investor(1)), 0);
}

#[test]
fn sale_must_own_ledger() {
    let err = Crowdsale::new(config(), MemoryCreditLedger::new(TREASURY)).unwrap_err();
    assert_eq!(err, SaleError::Ledger(LedgerError::NotOwner { caller: SALE }));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn restart_from_snapshot_resumes_sale() {
    let (mut sale, clock) = sale();
    sale.receive_payment(investor(1), 10_000 * ETHER).unwrap();
    let closing = sale.closing_time();
    let json = serde_json::to_string(&sale.snapshot()).unwrap();
    let ledger = sale.into_ledger();

    let snapshot: SaleSnapshot = serde_json::from_str(&json).unwrap();
    let mut resumed = Crowdsale::restore(snapshot, ledger).unwrap();
    resumed.set_clock(clock.source());
    assert_eq!(resumed.phase(), 2);
    assert_eq!(resumed.closing_time(), closing);
    assert!(resumed.window().is_extended());

    let r = resumed.receive_payment(investor(2), ETHER).unwrap();
    assert_eq!(r.tokens, 10_500 * TOKEN);
    assert_eq!(r.extended_to, None);
}

#[test]
fn restore_after_finalize() {
    let (mut sale, clock) = sale();
    sale.receive_payment(investor(1), ETHER).unwrap();
    sale.set_reserve_holder(OPERATOR, RESERVE).unwrap();
    clock.set(sale.closing_time());
    sale.finalize(investor(1)).unwrap();
    let snapshot = sale.snapshot();

    // Ownership has moved to the treasury; restoring still works.
    let resumed = Crowdsale::restore(snapshot, sale.into_ledger()).unwrap();
    assert!(resumed.is_finalized());
    assert_eq!(resumed.ledger().owner(), TREASURY);
}
