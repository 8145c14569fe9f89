//! Integration test suite for the Hardcap sale.
//!
//! Drives a full [`Crowdsale`](hardcap_sale::Crowdsale) over the in-memory
//! ledger with a manual clock, through purchase, assignment, extension and
//! finalization, and checks the supply and allocation invariants under
//! generated inputs.

pub mod helpers;
