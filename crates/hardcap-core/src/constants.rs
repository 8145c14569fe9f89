//! Sale constants. All token and payment values are in base units (10^18 per whole unit).

use crate::types::Amount;

/// Base units per whole token.
pub const TOKEN: Amount = 1_000_000_000_000_000_000;

/// Base units (wei) per whole payment unit (ether).
pub const ETHER: Amount = 1_000_000_000_000_000_000;

pub const BPS_PRECISION: u64 = 10_000;

/// Team share of the final supply, in basis points.
pub const DEFAULT_TEAM_BPS: u64 = 1_000;

/// Platform share of the final supply, in basis points.
pub const DEFAULT_PLATFORM_BPS: u64 = 2_500;

/// Crossing into this phase (zero-based) pushes the closing time out once.
pub const EXTENSION_PHASE: usize = 2;

pub const SECS_PER_DAY: u64 = 86_400;

/// Public sale length when the config does not name a closing time.
pub const DEFAULT_SALE_DURATION_SECS: u64 = 20 * SECS_PER_DAY;

/// Hard ceiling on the sale length, extensions included.
pub const DEFAULT_MAX_SALE_DURATION_SECS: u64 = 30 * SECS_PER_DAY;

/// Runway granted by the closing-time extension.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 2 * SECS_PER_DAY;

/// Smallest purchase, in whole tokens.
pub const DEFAULT_MIN_PURCHASE_TOKENS: u64 = 100;

/// Reference tier schedule as `(cumulative threshold, tokens per wei)`, thresholds in whole tokens.
///
/// One ether buys 11,500 tokens in the first wave, then 11,000, 10,500 and
/// 10,000. The last threshold is the hard cap.
///
/// # Examples
///
/// ```
/// use hardcap_core::constants::DEFAULT_TIERS;
/// assert_eq!(DEFAULT_TIERS.last().map(|t| t.0), Some(250_000_000));
/// ```
pub const DEFAULT_TIERS: &[(u64, u64)] = &[
    (57_500_000, 11_500),
    (112_500_000, 11_000),
    (165_000_000, 10_500),
    (250_000_000, 10_000),
];
