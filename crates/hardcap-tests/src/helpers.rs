//! Shared fixtures for the integration tests.

use hardcap_core::config::{SaleConfig, SaleParties};
use hardcap_core::ledger::MemoryCreditLedger;
use hardcap_core::types::{Address, Timestamp};
use hardcap_sale::clock::ManualClock;
use hardcap_sale::Crowdsale;

/// Public sale opening time used by every fixture.
pub const OPENING: Timestamp = 1_900_000_000;
/// Assignments open one day earlier.
pub const ASSIGN_OPENING: Timestamp = OPENING - 86_400;

pub const TREASURY: Address = Address::repeat_byte(0xA1);
pub const PLATFORM: Address = Address::repeat_byte(0xA2);
pub const ASSIGNER: Address = Address::repeat_byte(0xA3);
pub const OPERATOR: Address = Address::repeat_byte(0xA4);
pub const SALE: Address = Address::repeat_byte(0xA5);
pub const RESERVE: Address = Address::repeat_byte(0xA6);

/// Investor account from a seed byte.
pub fn investor(seed: u8) -> Address {
    let mut bytes = [0x10; 20];
    bytes[19] = seed;
    Address::from(bytes)
}

pub fn parties() -> SaleParties {
    SaleParties {
        treasury: TREASURY,
        platform: PLATFORM,
        assigner: ASSIGNER,
        operator: OPERATOR,
        sale: SALE,
    }
}

/// Reference deployment with an early assignment window.
pub fn config() -> SaleConfig {
    let mut config = SaleConfig::new(parties(), OPENING);
    config.assign_opening_time = ASSIGN_OPENING;
    config
}

/// A sale over a fresh ledger owned by the sale, clock at the opening time.
pub fn sale_with(config: SaleConfig) -> (Crowdsale<MemoryCreditLedger>, ManualClock) {
    sale_over(config, MemoryCreditLedger::new(SALE))
}

pub fn sale_over(
    config: SaleConfig,
    ledger: MemoryCreditLedger,
) -> (Crowdsale<MemoryCreditLedger>, ManualClock) {
    let clock = ManualClock::new(config.opening_time);
    let sale = Crowdsale::with_clock(config, ledger, clock.source())
        .expect("fixture config is valid");
    (sale, clock)
}

pub fn sale() -> (Crowdsale<MemoryCreditLedger>, ManualClock) {
    sale_with(config())
}
