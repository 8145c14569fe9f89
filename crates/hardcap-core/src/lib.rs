//! # hardcap-core
//! Foundation types and interfaces for the Hardcap crowdsale.
//!
//! - [`rate_table::RateTable`] — immutable price tiers and the `phase_for` lookup
//! - [`allocation::AllocationState`] — cumulative allocation and current phase
//! - [`window::SaleWindow`] — opening/closing schedule and finalization flag
//! - [`traits::CreditLedger`] — the token ledger the sale mints into
//! - [`ledger::MemoryCreditLedger`] — in-memory ledger for tests and the CLI

pub mod allocation;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod rate_table;
pub mod traits;
pub mod types;
pub mod window;
