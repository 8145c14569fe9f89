//! End-of-sale supply split.
//!
//! Tokens sold make up the investor share of the final supply. With weights
//! in basis points:
//!
//! ```text
//! final_supply = sold * 10_000 / investor_bps
//! team         = final_supply * team_bps / 10_000
//! platform     = final_supply * platform_bps / 10_000
//! ```
//!
//! All divisions round toward zero. The ledger ends with exactly
//! `sold + team + platform` tokens; anything else it holds on the sale's
//! account is burned.

use serde::{Deserialize, Serialize};

use hardcap_core::constants::BPS_PRECISION;
use hardcap_core::error::AmountError;
use hardcap_core::traits::LedgerOp;
use hardcap_core::types::{Address, Amount, Timestamp};

/// Supply amounts derived from the tokens sold.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupplySplit {
    pub sold: Amount,
    /// `sold` scaled up to the whole supply, before per-share rounding.
    pub final_supply: Amount,
    pub team: Amount,
    pub platform: Amount,
}

impl SupplySplit {
    /// Supply the ledger must hold once finalized.
    pub fn minted_total(&self) -> Amount {
        self.sold + self.team + self.platform
    }
}

/// Outcome of a successful finalization.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalSplit {
    pub split: SupplySplit,
    /// Unsold capacity destroyed from the sale's own balance.
    pub burned: Amount,
    pub reserve_holder: Address,
    pub finalized_at: Timestamp,
}

/// Compute the split for `sold` tokens.
///
/// `sold == 0` yields an all-zero split. Shares round toward zero, so
/// `minted_total` may fall short of `final_supply` by at most 2 base units.
///
/// # Errors
///
/// [`AmountError::ArithmeticOverflow`] if the weights leave no investor share
/// or an intermediate product overflows.
pub fn compute_split(sold: Amount, team_bps: u64, platform_bps: u64) -> Result<SupplySplit, AmountError> {
    let investor_bps = BPS_PRECISION
        .checked_sub(team_bps)
        .and_then(|r| r.checked_sub(platform_bps))
        .filter(|&r| r > 0)
        .ok_or(AmountError::ArithmeticOverflow)?;

    let precision = BPS_PRECISION as Amount;
    let final_supply = sold
        .checked_mul(precision)
        .ok_or(AmountError::ArithmeticOverflow)?
        / investor_bps as Amount;
    let share = |bps: u64| {
        final_supply
            .checked_mul(bps as Amount)
            .map(|v| v / precision)
            .ok_or(AmountError::ArithmeticOverflow)
    };

    Ok(SupplySplit {
        sold,
        final_supply,
        team: share(team_bps)?,
        platform: share(platform_bps)?,
    })
}

/// Ledger operations that finalize a sale, in execution order.
///
/// Zero-amount mints and burns are left out.
pub fn plan_ledger_ops(
    split: &SupplySplit,
    excess: Amount,
    reserve_holder: Address,
    platform: Address,
    treasury: Address,
) -> Vec<LedgerOp> {
    let mut ops = Vec::with_capacity(5);
    if split.team > 0 {
        ops.push(LedgerOp::Mint { to: reserve_holder, amount: split.team });
    }
    if split.platform > 0 {
        ops.push(LedgerOp::Mint { to: platform, amount: split.platform });
    }
    if excess > 0 {
        ops.push(LedgerOp::Burn { amount: excess });
    }
    ops.push(LedgerOp::FinishMinting);
    ops.push(LedgerOp::TransferOwnership { new_owner: treasury });
    ops
}
