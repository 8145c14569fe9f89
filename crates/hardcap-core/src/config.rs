//! Deployment configuration for a sale.
//!
//! [`SaleConfig`] carries every deployment parameter: the parties, the tier
//! schedule, the timing and the supply split. Tier thresholds and the minimum
//! purchase are written in whole tokens so config files stay within 64-bit
//! integers; [`SaleConfig::rate_table`] scales them to base units.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BPS_PRECISION, DEFAULT_GRACE_PERIOD_SECS, DEFAULT_MAX_SALE_DURATION_SECS,
    DEFAULT_MIN_PURCHASE_TOKENS, DEFAULT_PLATFORM_BPS, DEFAULT_SALE_DURATION_SECS,
    DEFAULT_TEAM_BPS, DEFAULT_TIERS, TOKEN,
};
use crate::error::ConfigError;
use crate::rate_table::{RateTable, RateTier};
use crate::types::{Address, Amount, Timestamp};
use crate::window::SaleWindow;

/// Who may call `finalize`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinalizePolicy {
    /// Anyone, once the preconditions hold.
    #[default]
    Anyone,
    /// Only the operator.
    OperatorOnly,
}

/// One tier as written in a config file.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierConfig {
    /// Cumulative allocation, in whole tokens, at which the tier ends.
    pub up_to: u64,
    /// Tokens per wei.
    pub rate: u64,
}

/// The accounts taking part in a sale.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaleParties {
    /// Receives forwarded payments and, after finalization, ledger ownership.
    pub treasury: Address,
    /// Receives the platform share at finalization.
    pub platform: Address,
    /// May allocate tokens without payment.
    pub assigner: Address,
    /// Configures the reserve holder and settles refunds.
    pub operator: Address,
    /// The sale's own account on the credit ledger.
    pub sale: Address,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SaleConfig {
    pub parties: SaleParties,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
    pub opening_time: Timestamp,
    pub assign_opening_time: Timestamp,
    pub closing_time: Timestamp,
    pub absolute_max_closing_time: Timestamp,
    /// Smallest purchase, in whole tokens.
    #[serde(default = "default_min_purchase")]
    pub min_purchase: u64,
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
    #[serde(default = "default_team_bps")]
    pub team_bps: u64,
    #[serde(default = "default_platform_bps")]
    pub platform_bps: u64,
    #[serde(default)]
    pub finalize_policy: FinalizePolicy,
}

fn default_tiers() -> Vec<TierConfig> {
    DEFAULT_TIERS
        .iter()
        .map(|&(up_to, rate)| TierConfig { up_to, rate })
        .collect()
}

fn default_min_purchase() -> u64 {
    DEFAULT_MIN_PURCHASE_TOKENS
}

fn default_grace_period() -> u64 {
    DEFAULT_GRACE_PERIOD_SECS
}

fn default_team_bps() -> u64 {
    DEFAULT_TEAM_BPS
}

fn default_platform_bps() -> u64 {
    DEFAULT_PLATFORM_BPS
}

impl SaleConfig {
    /// Reference deployment opening at `opening_time`.
    ///
    /// Assignment opens with the sale; closing and the absolute maximum
    /// follow the default durations.
    ///
    /// # Examples
    ///
    /// ```
    /// use hardcap_core::config::{SaleConfig, SaleParties};
    /// use hardcap_core::types::Address;
    ///
    /// let parties = SaleParties {
    ///     treasury: Address::repeat_byte(1),
    ///     platform: Address::repeat_byte(2),
    ///     assigner: Address::repeat_byte(3),
    ///     operator: Address::repeat_byte(4),
    ///     sale: Address::repeat_byte(5),
    /// };
    /// let config = SaleConfig::new(parties, 1_000);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(parties: SaleParties, opening_time: Timestamp) -> Self {
        Self {
            parties,
            tiers: default_tiers(),
            opening_time,
            assign_opening_time: opening_time,
            closing_time: opening_time.saturating_add(DEFAULT_SALE_DURATION_SECS),
            absolute_max_closing_time: opening_time.saturating_add(DEFAULT_MAX_SALE_DURATION_SECS),
            min_purchase: DEFAULT_MIN_PURCHASE_TOKENS,
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            team_bps: DEFAULT_TEAM_BPS,
            platform_bps: DEFAULT_PLATFORM_BPS,
            finalize_policy: FinalizePolicy::default(),
        }
    }

    /// The tier schedule in base units.
    pub fn rate_table(&self) -> Result<RateTable, ConfigError> {
        let tiers = self
            .tiers
            .iter()
            .map(|t| {
                let threshold = (t.up_to as Amount)
                    .checked_mul(TOKEN)
                    .ok_or(ConfigError::Overflow("tier threshold"))?;
                Ok(RateTier { threshold, rate: t.rate as Amount })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        RateTable::new(tiers)
    }

    /// The initial sale window.
    pub fn window(&self) -> Result<SaleWindow, ConfigError> {
        SaleWindow::new(
            self.opening_time,
            self.assign_opening_time,
            self.closing_time,
            self.absolute_max_closing_time,
        )
    }

    /// Minimum purchase in base units.
    pub fn min_purchase_amount(&self) -> Amount {
        (self.min_purchase as Amount).saturating_mul(TOKEN)
    }

    /// Investor share of the final supply, in basis points.
    pub fn investor_bps(&self) -> u64 {
        BPS_PRECISION.saturating_sub(self.team_bps.saturating_add(self.platform_bps))
    }

    /// Check every invariant a deployment must satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.parties;
        for (name, address) in [
            ("treasury", p.treasury),
            ("platform", p.platform),
            ("assigner", p.assigner),
            ("operator", p.operator),
            ("sale", p.sale),
        ] {
            if address.is_zero() {
                return Err(ConfigError::ZeroAddress(name));
            }
        }
        self.rate_table()?;
        self.window()?;
        let weights = self.team_bps.checked_add(self.platform_bps);
        if !matches!(weights, Some(w) if w < BPS_PRECISION) {
            return Err(ConfigError::InvalidWeights {
                team_bps: self.team_bps,
                platform_bps: self.platform_bps,
            });
        }
        Ok(())
    }
}
