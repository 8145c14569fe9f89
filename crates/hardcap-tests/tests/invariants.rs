//! Property tests for the sale invariants.
//!
//! Each property uses 256 cases. Checked here:
//! - the final supply always equals sold + team + platform
//! - allocation never exceeds the cap and the phase always matches the table
//! - the closing time never moves backwards and moves at most once
//! - a rejected call leaves the sale unchanged

use proptest::prelude::*;

use hardcap_core::constants::{DEFAULT_PLATFORM_BPS, DEFAULT_TEAM_BPS, ETHER, TOKEN};
use hardcap_core::traits::CreditLedger;
use hardcap_tests::helpers::*;

const CAP: u128 = 250_000_000 * TOKEN;

/// Reference tiers in whole tokens, restated here so the walk below is
/// checked against a schedule the sale does not share.
const TIERS: [(u128, u128); 4] = [
    (57_500_000, 11_500),
    (112_500_000, 11_000),
    (165_000_000, 10_500),
    (250_000_000, 10_000),
];

/// Plain tier walk: `(tokens yielded, wei consumed)` for `wei` paid at `total`.
fn reference_walk(mut total: u128, mut wei: u128) -> (u128, u128) {
    let (mut tokens, mut consumed) = (0, 0);
    for (threshold, rate) in TIERS {
        let threshold = threshold * TOKEN;
        if total >= threshold || wei == 0 {
            continue;
        }
        let capacity = threshold - total;
        if wei * rate <= capacity {
            tokens += wei * rate;
            consumed += wei;
            break;
        }
        let cost = (capacity + rate - 1) / rate;
        tokens += capacity;
        consumed += cost;
        total = threshold;
        wei = wei.saturating_sub(cost);
    }
    (tokens, consumed)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn finalized_supply_matches_split(sold in prop_oneof![Just(0u128), Just(CAP), 0u128..=CAP]) {
        let (mut sale, clock) = sale();
        if sold > 0 {
            sale.assign(ASSIGNER, investor(1), sold).unwrap();
        }
        sale.set_reserve_holder(OPERATOR, RESERVE).unwrap();
        clock.set(sale.closing_time());
        let f = sale.finalize(investor(2)).unwrap();

        let final_supply = sold * 10_000 / (10_000 - DEFAULT_TEAM_BPS - DEFAULT_PLATFORM_BPS) as u128;
        prop_assert_eq!(f.split.final_supply, final_supply);
        prop_assert_eq!(f.split.team, final_supply * DEFAULT_TEAM_BPS as u128 / 10_000);
        prop_assert_eq!(f.split.platform, final_supply * DEFAULT_PLATFORM_BPS as u128 / 10_000);
        prop_assert_eq!(sale.ledger().total_supply(), sold + f.split.team + f.split.platform);
        prop_assert_eq!(sale.ledger().owner(), TREASURY);
    }

    #[test]
    fn purchases_respect_cap_and_table(payments in prop::collection::vec(1u128..6_000, 1..12)) {
        let (mut sale, _) = sale();
        let mut sent = 0u128;
        let mut expected_total = 0u128;
        for (i, ether) in payments.iter().enumerate() {
            let before = sale.snapshot();
            let (tokens, consumed) = reference_walk(expected_total, ether * ETHER);
            match sale.receive_payment(investor(i as u8), ether * ETHER) {
                Ok(r) => {
                    sent += ether * ETHER;
                    prop_assert_eq!(r.wei_accepted + r.overflow.map_or(0, |o| o.amount), ether * ETHER);
                    prop_assert_eq!(r.tokens, tokens);
                    prop_assert_eq!(r.wei_accepted, consumed);
                    expected_total += tokens;
                }
                Err(_) => {
                    prop_assert_eq!(expected_total, CAP);
                    prop_assert_eq!(sale.snapshot(), before);
                }
            }
            let total = sale.total_allocated();
            prop_assert_eq!(total, expected_total);
            prop_assert!(total <= CAP);
            prop_assert_eq!(sale.phase(), sale.rate_table().phase_for(total));
            prop_assert_eq!(sale.ledger().total_supply(), total);
        }
        let overflow = sale.overflow_amount();
        prop_assert!(sale.wei_raised() + overflow <= sent);
        if overflow > 0 {
            prop_assert!(sale.is_sold_out());
        }
    }

    #[test]
    fn closing_time_moves_forward_once(
        steps in prop::collection::vec((0u64..200_000, 1u128..4_000), 1..10),
    ) {
        let (mut sale, clock) = sale();
        let max = sale.window().absolute_max_closing_time();
        let mut closing = sale.closing_time();
        let mut moves = 0;
        for (i, (dt, ether)) in steps.into_iter().enumerate() {
            clock.advance(dt);
            let _ = sale.receive_payment(investor(i as u8), ether * ETHER);
            let now_closing = sale.closing_time();
            prop_assert!(now_closing >= closing);
            prop_assert!(now_closing <= max);
            if now_closing != closing {
                moves += 1;
            }
            closing = now_closing;
        }
        prop_assert!(moves <= 1);
    }

    #[test]
    fn batch_is_all_or_nothing(amounts in prop::collection::vec(1u128..120_000_000, 1..5)) {
        let (mut sale, _) = sale();
        let requested: u128 = amounts.iter().map(|a| a * TOKEN).sum();
        let tokens: Vec<u128> = amounts.iter().map(|a| a * TOKEN).collect();
        let recipients: Vec<_> = (0..tokens.len()).map(|i| investor(i as u8)).collect();

        let before = sale.snapshot();
        let result = sale.assign_batch(ASSIGNER, &recipients, &tokens);
        if requested <= CAP {
            let receipts = result.unwrap();
            prop_assert_eq!(receipts.len(), tokens.len());
            prop_assert_eq!(sale.total_allocated(), requested);
            for (r, want) in receipts.iter().zip(&tokens) {
                prop_assert_eq!(r.tokens, *want);
            }
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(sale.snapshot(), before);
            prop_assert_eq!(sale.ledger().total_supply(), 0);
        }
    }
}
