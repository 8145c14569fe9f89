//! Trait interfaces for the Hardcap sale.
//!
//! - [`CreditLedger`] — the fungible token ledger the sale mints into. The
//!   sale owns it for the duration of the sale and hands ownership to the
//!   treasury at finalization.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::{Address, Amount};

/// A single ledger mutation, issued on behalf of a caller.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LedgerOp {
    /// Create `amount` tokens for `to`. Owner only, fails once minting finished.
    Mint { to: Address, amount: Amount },
    /// Destroy `amount` tokens from the caller's own balance.
    Burn { amount: Amount },
    /// Move tokens from the caller to `to`. Disabled until minting finished.
    Transfer { to: Address, amount: Amount },
    /// Permanently disable minting. Owner only.
    FinishMinting,
    /// Hand ledger ownership to a new account. Owner only.
    TransferOwnership { new_owner: Address },
}

/// Fungible credit ledger.
///
/// Every mutation goes through [`apply`](CreditLedger::apply), which must be
/// all-or-nothing: if any operation in the batch fails, the ledger is left
/// exactly as it was. The single-operation helpers are thin wrappers.
pub trait CreditLedger: Send + Sync {
    /// Balance of `holder` in base units.
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Sum of all balances.
    fn total_supply(&self) -> Amount;

    /// Current ledger owner.
    fn owner(&self) -> Address;

    /// Whether minting has been permanently disabled.
    fn minting_finished(&self) -> bool;

    /// Apply `ops` in order as `caller`, atomically.
    fn apply(&mut self, caller: &Address, ops: &[LedgerOp]) -> Result<(), LedgerError>;

    fn mint(&mut self, caller: &Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        self.apply(caller, &[LedgerOp::Mint { to, amount }])
    }

    fn burn(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.apply(caller, &[LedgerOp::Burn { amount }])
    }

    fn transfer(&mut self, caller: &Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        self.apply(caller, &[LedgerOp::Transfer { to, amount }])
    }

    fn finish_minting(&mut self, caller: &Address) -> Result<(), LedgerError> {
        self.apply(caller, &[LedgerOp::FinishMinting])
    }

    fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<(), LedgerError> {
        self.apply(caller, &[LedgerOp::TransferOwnership { new_owner }])
    }
}
