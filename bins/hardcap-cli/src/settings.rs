//! Deployment settings.
//!
//! Loaded with the `config` crate from an optional TOML or JSON file, then
//! overridden by `HARDCAP_*` environment variables (`HARDCAP_OPENING_TIME`,
//! `HARDCAP_TEAM_BPS`, ...). Only the parties and the opening time are
//! required; everything else falls back to the reference deployment.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use hardcap_core::config::{FinalizePolicy, SaleConfig, SaleParties, TierConfig};
use hardcap_core::types::{Address, Timestamp};

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub treasury: Address,
    pub platform: Address,
    pub assigner: Address,
    pub operator: Address,
    /// Account the sale acts as on the ledger.
    pub sale: Address,
    pub opening_time: Timestamp,
    pub assign_opening_time: Option<Timestamp>,
    pub closing_time: Option<Timestamp>,
    pub absolute_max_closing_time: Option<Timestamp>,
    pub grace_period_secs: Option<u64>,
    /// Whole tokens.
    pub min_purchase: Option<u64>,
    pub team_bps: Option<u64>,
    pub platform_bps: Option<u64>,
    pub finalize_policy: Option<FinalizePolicy>,
    pub tiers: Option<Vec<TierConfig>>,
    /// Whole tokens minted to the sale account at init and burned at finalize.
    #[serde(default)]
    pub premint: u64,
}

impl Settings {
    /// Load from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(config::Environment::with_prefix("HARDCAP").try_parsing(true))
            .build()
            .context("failed to read settings")?
            .try_deserialize()
            .context("invalid settings")
    }

    /// Build and validate the sale config.
    pub fn sale_config(&self) -> Result<SaleConfig> {
        let parties = SaleParties {
            treasury: self.treasury,
            platform: self.platform,
            assigner: self.assigner,
            operator: self.operator,
            sale: self.sale,
        };
        let mut config = SaleConfig::new(parties, self.opening_time);
        if let Some(t) = self.assign_opening_time {
            config.assign_opening_time = t;
        }
        if let Some(t) = self.closing_time {
            config.closing_time = t;
        }
        if let Some(t) = self.absolute_max_closing_time {
            config.absolute_max_closing_time = t;
        }
        if let Some(secs) = self.grace_period_secs {
            config.grace_period_secs = secs;
        }
        if let Some(min) = self.min_purchase {
            config.min_purchase = min;
        }
        if let Some(bps) = self.team_bps {
            config.team_bps = bps;
        }
        if let Some(bps) = self.platform_bps {
            config.platform_bps = bps;
        }
        if let Some(policy) = self.finalize_policy {
            config.finalize_policy = policy;
        }
        if let Some(tiers) = &self.tiers {
            config.tiers = tiers.clone();
        }
        config.validate().context("invalid sale config")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardcap_core::constants::DEFAULT_SALE_DURATION_SECS;
    use std::io::Write;

    const TOML: &str = r#"
treasury = "0x0101010101010101010101010101010101010101"
platform = "0x0202020202020202020202020202020202020202"
assigner = "0x0303030303030303030303030303030303030303"
operator = "0x0404040404040404040404040404040404040404"
sale = "0x0505050505050505050505050505050505050505"
opening_time = 1900000000
team_bps = 1500
finalize_policy = "operator_only"
premint = 1000

[[tiers]]
up_to = 1000
rate = 20

[[tiers]]
up_to = 5000
rate = 10
"#;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_toml_with_defaults() {
        let file = write(TOML);
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.premint, 1_000);
        let config = settings.sale_config().unwrap();
        assert_eq!(config.parties.sale, Address::repeat_byte(5));
        assert_eq!(config.team_bps, 1_500);
        assert_eq!(config.finalize_policy, FinalizePolicy::OperatorOnly);
        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.closing_time, 1_900_000_000 + DEFAULT_SALE_DURATION_SECS);
    }

    #[test]
    fn rejects_invalid_schedule() {
        let file = write(&TOML.replace("premint = 1000", "premint = 1000\nclosing_time = 1"));
        let settings = Settings::load(Some(file.path())).unwrap();
        assert!(settings.sale_config().is_err());
    }

    #[test]
    fn rejects_bad_address() {
        let file = write(&TOML.replace("0x0101010101010101010101010101010101010101", "0x01"));
        assert!(Settings::load(Some(file.path())).is_err());
    }
}
