//! Cumulative allocation and the active phase.

use serde::{Deserialize, Serialize};

use crate::error::AmountError;
use crate::rate_table::RateTable;
use crate::types::Amount;

/// Tokens allocated so far, by purchase or assignment, and the tier now selling.
///
/// `phase` is always `table.phase_for(total_allocated)`; both only grow.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationState {
    total_allocated: Amount,
    phase: usize,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts, rejecting a phase that disagrees with the table.
    pub fn from_parts(total_allocated: Amount, phase: usize, table: &RateTable) -> Option<Self> {
        (total_allocated <= table.cap() && table.phase_for(total_allocated) == phase)
            .then_some(Self { total_allocated, phase })
    }

    pub fn total_allocated(&self) -> Amount {
        self.total_allocated
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    /// Capacity left before the hard cap.
    pub fn remaining(&self, table: &RateTable) -> Amount {
        table.cap().saturating_sub(self.total_allocated)
    }

    pub fn is_sold_out(&self, table: &RateTable) -> bool {
        self.total_allocated >= table.cap()
    }

    /// Add `amount` to the allocation and recompute the phase.
    ///
    /// Returns the number of thresholds crossed.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ExceedsCap`] if the new total would pass the cap
    /// - [`AmountError::ArithmeticOverflow`] on `u128` overflow
    pub fn advance(&mut self, amount: Amount, table: &RateTable) -> Result<usize, AmountError> {
        let total = self
            .total_allocated
            .checked_add(amount)
            .ok_or(AmountError::ArithmeticOverflow)?;
        if total > table.cap() {
            return Err(AmountError::ExceedsCap { total, cap: table.cap() });
        }
        let phase = table.phase_for(total);
        let crossed = phase - self.phase;
        self.total_allocated = total;
        self.phase = phase;
        Ok(crossed)
    }
}
