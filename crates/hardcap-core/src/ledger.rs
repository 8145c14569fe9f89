//! In-memory credit ledger.
//!
//! [`MemoryCreditLedger`] keeps balances in a `BTreeMap` with no persistence
//! of its own. It is serializable so the CLI can store it next to the sale
//! snapshot, and it backs every test in the workspace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::traits::{CreditLedger, LedgerOp};
use crate::types::{Address, Amount};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MemoryCreditLedger {
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
    owner: Address,
    minting_finished: bool,
    /// Absolute mint ceiling, independent of the sale cap.
    mint_ceiling: Option<Amount>,
}

impl MemoryCreditLedger {
    /// Create an empty ledger owned by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            balances: BTreeMap::new(),
            total_supply: 0,
            owner,
            minting_finished: false,
            mint_ceiling: None,
        }
    }

    /// Limit total supply to `ceiling`.
    pub fn with_mint_ceiling(mut self, ceiling: Amount) -> Self {
        self.mint_ceiling = Some(ceiling);
        self
    }

    /// Number of accounts with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    fn apply_one(&mut self, caller: &Address, op: &LedgerOp) -> Result<(), LedgerError> {
        match *op {
            LedgerOp::Mint { to, amount } => {
                self.ensure_owner(caller)?;
                if self.minting_finished {
                    return Err(LedgerError::MintingFinished);
                }
                let supply = self
                    .total_supply
                    .checked_add(amount)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                if let Some(ceiling) = self.mint_ceiling {
                    if supply > ceiling {
                        return Err(LedgerError::CeilingExceeded { supply, ceiling });
                    }
                }
                self.credit(to, amount)?;
                self.total_supply = supply;
            }
            LedgerOp::Burn { amount } => {
                self.debit(*caller, amount)?;
                self.total_supply -= amount;
            }
            LedgerOp::Transfer { to, amount } => {
                if !self.minting_finished {
                    return Err(LedgerError::TransfersDisabled);
                }
                self.debit(*caller, amount)?;
                self.credit(to, amount)?;
            }
            LedgerOp::FinishMinting => {
                self.ensure_owner(caller)?;
                if self.minting_finished {
                    return Err(LedgerError::AlreadyFinished);
                }
                self.minting_finished = true;
            }
            LedgerOp::TransferOwnership { new_owner } => {
                self.ensure_owner(caller)?;
                self.owner = new_owner;
            }
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.owner {
            return Err(LedgerError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    fn credit(&mut self, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    fn debit(&mut self, holder: Address, amount: Amount) -> Result<(), LedgerError> {
        let have = self.balance_of(&holder);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { holder, have, need: amount });
        }
        if have == amount {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, have - amount);
        }
        Ok(())
    }
}

/// Prior values of everything a batch may change, restored on failure.
struct Journal {
    total_supply: Amount,
    owner: Address,
    minting_finished: bool,
    balances: Vec<(Address, Option<Amount>)>,
}

impl Journal {
    fn open(ledger: &MemoryCreditLedger) -> Self {
        Self {
            total_supply: ledger.total_supply,
            owner: ledger.owner,
            minting_finished: ledger.minting_finished,
            balances: Vec::new(),
        }
    }

    /// Remember `holder`'s balance the first time the batch touches it.
    fn record(&mut self, ledger: &MemoryCreditLedger, holder: Address) {
        if self.balances.iter().all(|(seen, _)| *seen != holder) {
            self.balances.push((holder, ledger.balances.get(&holder).copied()));
        }
    }

    fn rollback(self, ledger: &mut MemoryCreditLedger) {
        for (holder, prior) in self.balances {
            match prior {
                Some(balance) => ledger.balances.insert(holder, balance),
                None => ledger.balances.remove(&holder),
            };
        }
        ledger.total_supply = self.total_supply;
        ledger.owner = self.owner;
        ledger.minting_finished = self.minting_finished;
    }
}

impl LedgerOp {
    /// Balances this op can change when applied by `caller`.
    fn touched(&self, caller: &Address) -> Vec<Address> {
        match *self {
            LedgerOp::Mint { to, .. } => vec![to],
            LedgerOp::Burn { .. } => vec![*caller],
            LedgerOp::Transfer { to, .. } => vec![*caller, to],
            LedgerOp::FinishMinting | LedgerOp::TransferOwnership { .. } => Vec::new(),
        }
    }
}

impl CreditLedger for MemoryCreditLedger {
    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn minting_finished(&self) -> bool {
        self.minting_finished
    }

    fn apply(&mut self, caller: &Address, ops: &[LedgerOp]) -> Result<(), LedgerError> {
        let mut journal = Journal::open(self);
        for op in ops {
            for holder in op.touched(caller) {
                journal.record(self, holder);
            }
            if let Err(err) = self.apply_one(caller, op) {
                journal.rollback(self);
                return Err(err);
            }
        }
        Ok(())
    }
}
