//! Piecewise tier walk.
//!
//! Starting from the current allocation, a request is consumed tier by tier:
//! each tier takes `min(remaining, capacity)` at its own rate, the allocation
//! advances, and the walk moves to the next tier until the request is spent or
//! the cap is hit. Payments are walked in wei, assignments in tokens; both
//! share the band arithmetic but differ in what they do at the cap, which is
//! decided by the caller.
//!
//! A payment segment that fills a tier exactly is charged
//! `ceil(capacity / rate)` wei, so rounding never hands out unpaid tokens and
//! costs the buyer at most one wei per crossed tier.

use hardcap_core::allocation::AllocationState;
use hardcap_core::constants::EXTENSION_PHASE;
use hardcap_core::error::AmountError;
use hardcap_core::rate_table::RateTable;
use hardcap_core::types::{Amount, Rate};

/// The slice of a request consumed inside one tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub phase: usize,
    pub rate: Rate,
    /// Tokens allocated in this tier.
    pub tokens: Amount,
    /// Wei charged in this tier. Zero for assignments.
    pub wei: Amount,
}

/// Result of walking a payment through the tiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentWalk {
    pub tokens: Amount,
    pub wei_consumed: Amount,
    /// Wei left over because the cap was reached.
    pub overflow: Amount,
    pub phase_before: usize,
    pub phase_after: usize,
    pub segments: Vec<Segment>,
}

impl PaymentWalk {
    pub fn thresholds_crossed(&self) -> usize {
        self.phase_after - self.phase_before
    }
}

/// Result of walking a direct token request through the tiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenWalk {
    pub granted: Amount,
    /// Tokens that did not fit under the cap.
    pub unassigned: Amount,
    pub phase_before: usize,
    pub phase_after: usize,
    pub segments: Vec<Segment>,
}

/// Walk `wei` through the tiers from `state` without mutating anything.
pub fn walk_payment(
    table: &RateTable,
    state: &AllocationState,
    wei: Amount,
) -> Result<PaymentWalk, AmountError> {
    let cap = table.cap();
    let mut total = state.total_allocated();
    let mut remaining = wei;
    let mut tokens: Amount = 0;
    let mut segments = Vec::new();

    while remaining > 0 && total < cap {
        let phase = table.phase_for(total);
        let tier = table.tiers()[phase];
        let capacity = tier.threshold - total;

        // An overflowing product is certainly more than the tier can hold.
        let (yielded, cost) = match remaining.checked_mul(tier.rate) {
            Some(y) if y <= capacity => (y, remaining),
            _ => (capacity, capacity.div_ceil(tier.rate)),
        };

        tokens = tokens
            .checked_add(yielded)
            .ok_or(AmountError::ArithmeticOverflow)?;
        total += yielded;
        remaining -= cost;
        segments.push(Segment { phase, rate: tier.rate, tokens: yielded, wei: cost });
    }

    Ok(PaymentWalk {
        tokens,
        wei_consumed: wei - remaining,
        overflow: remaining,
        phase_before: state.phase(),
        phase_after: table.phase_for(total),
        segments,
    })
}

/// Walk a direct allocation of `tokens` through the tiers.
pub fn walk_tokens(table: &RateTable, state: &AllocationState, tokens: Amount) -> TokenWalk {
    let cap = table.cap();
    let mut total = state.total_allocated();
    let mut remaining = tokens;
    let mut segments = Vec::new();

    while remaining > 0 && total < cap {
        let phase = table.phase_for(total);
        let tier = table.tiers()[phase];
        let take = remaining.min(tier.threshold - total);
        total += take;
        remaining -= take;
        segments.push(Segment { phase, rate: tier.rate, tokens: take, wei: 0 });
    }

    TokenWalk {
        granted: tokens - remaining,
        unassigned: remaining,
        phase_before: state.phase(),
        phase_after: table.phase_for(total),
        segments,
    }
}

/// Whether a move from `before` to `after` enters the extension phase.
pub fn crosses_extension_phase(before: usize, after: usize) -> bool {
    before < EXTENSION_PHASE && after >= EXTENSION_PHASE
}
