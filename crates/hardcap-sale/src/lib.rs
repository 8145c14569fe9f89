//! Sale engine for Hardcap.
//!
//! - [`pricing`] — tier walk for payments and direct assignments
//! - [`finalization`] — team/platform split and the closing ledger batch
//! - [`sale::Crowdsale`] — the sale state machine over a [`CreditLedger`](hardcap_core::traits::CreditLedger)
//! - [`handle::SaleHandle`] — shared, lock-guarded access for concurrent callers
//! - [`clock`] — system time, plus a manual clock under the `testing` feature

pub mod clock;
pub mod finalization;
pub mod handle;
pub mod pricing;
pub mod sale;

pub use finalization::{FinalSplit, SupplySplit};
pub use handle::SaleHandle;
pub use sale::{AssignmentReceipt, Crowdsale, PurchaseReceipt, SaleSnapshot};
