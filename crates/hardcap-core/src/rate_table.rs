//! Price tiers and phase lookup.
//!
//! A [`RateTable`] is an ordered list of `(threshold, rate)` tiers over
//! cumulative allocation. Tier `i` sells the band
//! `[threshold[i - 1], threshold[i])` at `rate[i]` tokens per wei; the last
//! threshold is the hard cap. Thresholds strictly increase and rates strictly
//! decrease, so every later tier is more expensive.
//!
//! A threshold reached exactly belongs to the next tier: with thresholds
//! `[100, 200]`, allocation 99 is phase 0 and allocation 100 is phase 1. At the
//! cap the phase stays on the last index.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Amount, Rate};

/// One price tier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateTier {
    /// Cumulative allocation at which this tier is exhausted.
    pub threshold: Amount,
    /// Tokens yielded per wei while this tier is active.
    pub rate: Rate,
}

/// Validated, immutable tier schedule.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "Vec<RateTier>", into = "Vec<RateTier>")]
pub struct RateTable {
    tiers: Vec<RateTier>,
}

impl RateTable {
    /// Build a table, checking ordering and non-zero rates.
    pub fn new(tiers: Vec<RateTier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::EmptyRateTable);
        }
        for (index, tier) in tiers.iter().enumerate() {
            if tier.rate == 0 {
                return Err(ConfigError::ZeroRate { index });
            }
            if index == 0 {
                if tier.threshold == 0 {
                    return Err(ConfigError::ThresholdsNotIncreasing { index });
                }
                continue;
            }
            let prev = &tiers[index - 1];
            if tier.threshold <= prev.threshold {
                return Err(ConfigError::ThresholdsNotIncreasing { index });
            }
            if tier.rate >= prev.rate {
                return Err(ConfigError::RatesNotDecreasing { index });
            }
        }
        Ok(Self { tiers })
    }

    /// The global hard cap: the last tier's threshold.
    pub fn cap(&self) -> Amount {
        self.tiers[self.tiers.len() - 1].threshold
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always false for a constructed table.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[RateTier] {
        &self.tiers
    }

    /// Index of the last tier.
    pub fn last_phase(&self) -> usize {
        self.tiers.len() - 1
    }

    /// Phase active at a given cumulative allocation.
    ///
    /// Counts the thresholds already reached, clamped to the last tier.
    pub fn phase_for(&self, total_allocated: Amount) -> usize {
        let reached = self
            .tiers
            .partition_point(|tier| tier.threshold <= total_allocated);
        reached.min(self.last_phase())
    }

    /// Rate active at a given cumulative allocation.
    pub fn rate_at(&self, total_allocated: Amount) -> Rate {
        self.tiers[self.phase_for(total_allocated)].rate
    }

    /// Lower bound of a tier's band: the previous threshold, or zero.
    pub fn tier_floor(&self, phase: usize) -> Amount {
        match phase {
            0 => 0,
            p => self.tiers[(p - 1).min(self.last_phase())].threshold,
        }
    }

    /// Token capacity of a tier's band.
    pub fn tier_capacity(&self, phase: usize) -> Amount {
        match self.tiers.get(phase) {
            Some(tier) => tier.threshold - self.tier_floor(phase),
            None => 0,
        }
    }
}

impl TryFrom<Vec<RateTier>> for RateTable {
    type Error = ConfigError;

    fn try_from(tiers: Vec<RateTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<RateTable> for Vec<RateTier> {
    fn from(table: RateTable) -> Self {
        table.tiers
    }
}
