//! The crowdsale state machine.
//!
//! [`Crowdsale`] owns the allocation state, the sale window and the credit
//! ledger, and exposes every state-changing operation as a `&mut self`
//! method. Each operation works on copies of the state, performs its single
//! ledger call (or one atomic batch), and only then commits the copies, so a
//! failed call leaves both the sale and the ledger untouched.
//!
//! Single purchases and batch assignments share the tier walk but not the
//! cap policy: a purchase that hits the cap is truncated and the unconsumed
//! payment recorded as overflow, while a batch that does not fit is rejected
//! whole.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hardcap_core::allocation::AllocationState;
use hardcap_core::config::{FinalizePolicy, SaleConfig};
use hardcap_core::error::{
    AmountError, AuthorizationError, ConfigError, LedgerError, SaleError, StateError,
};
use hardcap_core::rate_table::RateTable;
use hardcap_core::traits::{CreditLedger, LedgerOp};
use hardcap_core::types::{Address, Amount, OverflowRecord, Rate, Timestamp};
use hardcap_core::window::SaleWindow;

use crate::clock::system_now;
use crate::finalization::{self, FinalSplit};
use crate::pricing::{self, PaymentWalk};

/// Outcome of a purchase.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub purchaser: Address,
    pub beneficiary: Address,
    pub tokens: Amount,
    /// Wei kept by the sale and forwarded to the treasury.
    pub wei_accepted: Amount,
    pub forwarded_to: Address,
    /// Set when the cap truncated the purchase.
    pub overflow: Option<OverflowRecord>,
    pub phase: usize,
    /// New closing time if this purchase triggered the extension.
    pub extended_to: Option<Timestamp>,
}

/// Outcome of one assignment.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssignmentReceipt {
    pub beneficiary: Address,
    pub tokens: Amount,
    /// Requested tokens that did not fit under the cap.
    pub unassigned: Amount,
    pub phase: usize,
    pub extended_to: Option<Timestamp>,
}

/// Everything needed to rebuild a sale around its ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SaleSnapshot {
    pub config: SaleConfig,
    pub allocation: AllocationState,
    pub window: SaleWindow,
    pub overflow: Option<OverflowRecord>,
    pub wei_raised: Amount,
    pub reserve_holder: Option<Address>,
}

pub struct Crowdsale<L> {
    config: SaleConfig,
    table: RateTable,
    min_purchase: Amount,
    allocation: AllocationState,
    window: SaleWindow,
    overflow: Option<OverflowRecord>,
    wei_raised: Amount,
    reserve_holder: Option<Address>,
    ledger: L,
    clock: Box<dyn Fn() -> Timestamp + Send + Sync>,
}

impl<L> fmt::Debug for Crowdsale<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crowdsale")
            .field("allocation", &self.allocation)
            .field("window", &self.window)
            .field("wei_raised", &self.wei_raised)
            .finish_non_exhaustive()
    }
}

impl<L: CreditLedger> Crowdsale<L> {
    /// Create a sale reading the system clock.
    ///
    /// The ledger must already be owned by the sale's account.
    ///
    /// # Errors
    ///
    /// - [`SaleError::Config`] if the config fails validation
    /// - [`LedgerError::NotOwner`] if the sale does not own the ledger
    pub fn new(config: SaleConfig, ledger: L) -> Result<Self, SaleError> {
        config.validate()?;
        let table = config.rate_table()?;
        let window = config.window()?;
        Self::assemble(config, table, AllocationState::new(), window, ledger)
    }

    /// Create a sale driven by a custom clock.
    #[cfg(any(test, feature = "testing"))]
    pub fn with_clock(
        config: SaleConfig,
        ledger: L,
        clock: impl Fn() -> Timestamp + Send + Sync + 'static,
    ) -> Result<Self, SaleError> {
        let mut sale = Self::new(config, ledger)?;
        sale.set_clock(clock);
        Ok(sale)
    }

    /// Replace the clock.
    #[cfg(any(test, feature = "testing"))]
    pub fn set_clock(&mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) {
        self.clock = Box::new(clock);
    }

    /// Rebuild a sale from a snapshot and the ledger it was minting into.
    pub fn restore(snapshot: SaleSnapshot, ledger: L) -> Result<Self, SaleError> {
        let SaleSnapshot { config, allocation, window, overflow, wei_raised, reserve_holder } = snapshot;
        config.validate()?;
        let table = config.rate_table()?;
        window.validate()?;

        let inconsistent = |what: &str| SaleError::from(StateError::InconsistentSnapshot(what.to_string()));
        AllocationState::from_parts(allocation.total_allocated(), allocation.phase(), &table)
            .ok_or_else(|| inconsistent("allocation does not match the rate table"))?;
        if window.opening_time() != config.opening_time
            || window.assign_opening_time() != config.assign_opening_time
            || window.absolute_max_closing_time() != config.absolute_max_closing_time
            || window.closing_time() < config.closing_time
        {
            return Err(inconsistent("window does not match the config"));
        }
        if window.is_finalized() && reserve_holder.is_none() {
            return Err(inconsistent("finalized without a reserve holder"));
        }

        let mut sale = if window.is_finalized() {
            // Ownership has moved to the treasury.
            Self::assemble_unchecked(config, table, allocation, window, ledger)
        } else {
            Self::assemble(config, table, allocation, window, ledger)?
        };
        sale.overflow = overflow;
        sale.wei_raised = wei_raised;
        sale.reserve_holder = reserve_holder;
        Ok(sale)
    }

    fn assemble(
        config: SaleConfig,
        table: RateTable,
        allocation: AllocationState,
        window: SaleWindow,
        ledger: L,
    ) -> Result<Self, SaleError> {
        let sale = config.parties.sale;
        if ledger.owner() != sale {
            return Err(LedgerError::NotOwner { caller: sale }.into());
        }
        Ok(Self::assemble_unchecked(config, table, allocation, window, ledger))
    }

    fn assemble_unchecked(
        config: SaleConfig,
        table: RateTable,
        allocation: AllocationState,
        window: SaleWindow,
        ledger: L,
    ) -> Self {
        Self {
            min_purchase: config.min_purchase_amount(),
            config,
            table,
            allocation,
            window,
            overflow: None,
            wei_raised: 0,
            reserve_holder: None,
            ledger,
            clock: Box::new(system_now),
        }
    }

    /// Capture the persistent state.
    pub fn snapshot(&self) -> SaleSnapshot {
        SaleSnapshot {
            config: self.config.clone(),
            allocation: self.allocation,
            window: self.window.clone(),
            overflow: self.overflow,
            wei_raised: self.wei_raised,
            reserve_holder: self.reserve_holder,
        }
    }

    fn now(&self) -> Timestamp {
        (self.clock)()
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    pub fn config(&self) -> &SaleConfig {
        &self.config
    }

    pub fn rate_table(&self) -> &RateTable {
        &self.table
    }

    pub fn window(&self) -> &SaleWindow {
        &self.window
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Give the ledger back, ending the sale object.
    pub fn into_ledger(self) -> L {
        self.ledger
    }

    pub fn phase(&self) -> usize {
        self.allocation.phase()
    }

    pub fn total_allocated(&self) -> Amount {
        self.allocation.total_allocated()
    }

    pub fn remaining_capacity(&self) -> Amount {
        self.allocation.remaining(&self.table)
    }

    pub fn is_sold_out(&self) -> bool {
        self.allocation.is_sold_out(&self.table)
    }

    /// Tokens per wei at the current allocation.
    pub fn current_rate(&self) -> Rate {
        self.table.rate_at(self.allocation.total_allocated())
    }

    pub fn closing_time(&self) -> Timestamp {
        self.window.closing_time()
    }

    /// Total wei accepted and forwarded to the treasury.
    pub fn wei_raised(&self) -> Amount {
        self.wei_raised
    }

    pub fn overflow(&self) -> Option<OverflowRecord> {
        self.overflow
    }

    /// Owner of the pending overflow, or the zero address.
    pub fn overflow_owner(&self) -> Address {
        self.overflow.map(|o| o.owner).unwrap_or(Address::ZERO)
    }

    /// Pending overflow in wei, or zero.
    pub fn overflow_amount(&self) -> Amount {
        self.overflow.map(|o| o.amount).unwrap_or(0)
    }

    pub fn reserve_holder(&self) -> Option<Address> {
        self.reserve_holder
    }

    pub fn is_finalized(&self) -> bool {
        self.window.is_finalized()
    }

    pub fn finalized_at(&self) -> Option<Timestamp> {
        self.window.finalized_at()
    }

    /// Whether public purchases are accepted right now.
    pub fn is_open(&self) -> bool {
        self.window.is_open(self.now())
    }

    /// Price `wei` against the current allocation without changing anything.
    pub fn quote(&self, wei: Amount) -> Result<PaymentWalk, AmountError> {
        pricing::walk_payment(&self.table, &self.allocation, wei)
    }

    // ------------------------------------------------------------------
    // purchases
    // ------------------------------------------------------------------

    /// Plain payment: the sender buys for themselves.
    pub fn receive_payment(&mut self, sender: Address, wei: Amount) -> Result<PurchaseReceipt, SaleError> {
        self.buy_tokens(sender, sender, wei)
    }

    /// `purchaser` pays `wei`; `beneficiary` receives the tokens.
    ///
    /// If the cap is reached before the payment is spent, the purchase is
    /// truncated and the remainder becomes the overflow record for
    /// `purchaser`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// - [`WindowError`](hardcap_core::error::WindowError) outside the public window or after finalization
    /// - [`AmountError::ZeroAmount`], [`AmountError::SoldOut`], [`AmountError::BelowMinimum`]
    /// - [`SaleError::Ledger`] if the mint fails
    pub fn buy_tokens(
        &mut self,
        purchaser: Address,
        beneficiary: Address,
        wei: Amount,
    ) -> Result<PurchaseReceipt, SaleError> {
        let now = self.now();
        self.window.ensure_open(now)?;
        if wei == 0 {
            return Err(AmountError::ZeroAmount.into());
        }
        if self.is_sold_out() {
            return Err(AmountError::SoldOut.into());
        }

        let walk = pricing::walk_payment(&self.table, &self.allocation, wei)?;
        if walk.tokens < self.min_purchase {
            return Err(AmountError::BelowMinimum { got: walk.tokens, min: self.min_purchase }.into());
        }
        let wei_raised = self
            .wei_raised
            .checked_add(walk.wei_consumed)
            .ok_or(AmountError::ArithmeticOverflow)?;

        let mut allocation = self.allocation;
        allocation.advance(walk.tokens, &self.table)?;
        let mut window = self.window.clone();
        let extended_to = self.extend_on_crossing(&mut window, walk.phase_before, walk.phase_after, now);

        self.ledger.mint(&self.config.parties.sale, beneficiary, walk.tokens)?;

        self.allocation = allocation;
        self.window = window;
        self.wei_raised = wei_raised;
        let overflow = (walk.overflow > 0).then_some(OverflowRecord { owner: purchaser, amount: walk.overflow });
        if let Some(record) = overflow {
            warn!("cap reached: {} wei overflow owed to {}", record.amount, record.owner);
            self.overflow = Some(record);
        }

        info!(
            "purchase: {} paid {} wei for {} tokens to {} (phase {})",
            purchaser, walk.wei_consumed, walk.tokens, beneficiary, allocation.phase()
        );

        Ok(PurchaseReceipt {
            purchaser,
            beneficiary,
            tokens: walk.tokens,
            wei_accepted: walk.wei_consumed,
            forwarded_to: self.config.parties.treasury,
            overflow,
            phase: allocation.phase(),
            extended_to,
        })
    }

    // ------------------------------------------------------------------
    // assignments
    // ------------------------------------------------------------------

    /// Allocate `tokens` to `beneficiary` without payment.
    ///
    /// A request larger than the remaining capacity is truncated; the
    /// remainder is reported as `unassigned` and does not touch the overflow
    /// record, which only tracks refundable payments.
    pub fn assign(
        &mut self,
        caller: Address,
        beneficiary: Address,
        tokens: Amount,
    ) -> Result<AssignmentReceipt, SaleError> {
        self.ensure_assigner(&caller)?;
        let now = self.now();
        self.window.ensure_assignable(now)?;
        if tokens == 0 {
            return Err(AmountError::ZeroAmount.into());
        }
        if self.is_sold_out() {
            return Err(AmountError::SoldOut.into());
        }

        let walk = pricing::walk_tokens(&self.table, &self.allocation, tokens);
        let mut allocation = self.allocation;
        allocation.advance(walk.granted, &self.table)?;
        let mut window = self.window.clone();
        let extended_to = self.extend_on_crossing(&mut window, walk.phase_before, walk.phase_after, now);

        self.ledger.mint(&self.config.parties.sale, beneficiary, walk.granted)?;

        self.allocation = allocation;
        self.window = window;
        if walk.unassigned > 0 {
            warn!("assignment to {} truncated at cap, {} tokens unassigned", beneficiary, walk.unassigned);
        }
        info!("assignment: {} tokens to {} (phase {})", walk.granted, beneficiary, allocation.phase());

        Ok(AssignmentReceipt {
            beneficiary,
            tokens: walk.granted,
            unassigned: walk.unassigned,
            phase: allocation.phase(),
            extended_to,
        })
    }

    /// Assign `amounts[i]` to `recipients[i]`, in order, all or nothing.
    ///
    /// Each entry is walked against the allocation left by the previous one.
    ///
    /// # Errors
    ///
    /// - [`AmountError::LengthMismatch`] if the slices differ in length
    /// - [`AmountError::ZeroAmount`] if any amount is zero
    /// - [`AmountError::BatchExceedsCapacity`] if the batch does not fit under the cap
    pub fn assign_batch(
        &mut self,
        caller: Address,
        recipients: &[Address],
        amounts: &[Amount],
    ) -> Result<Vec<AssignmentReceipt>, SaleError> {
        self.ensure_assigner(&caller)?;
        let now = self.now();
        self.window.ensure_assignable(now)?;
        if recipients.len() != amounts.len() {
            return Err(AmountError::LengthMismatch {
                recipients: recipients.len(),
                amounts: amounts.len(),
            }
            .into());
        }
        if amounts.contains(&0) {
            return Err(AmountError::ZeroAmount.into());
        }
        let requested = amounts
            .iter()
            .try_fold(0 as Amount, |acc, &a| acc.checked_add(a))
            .ok_or(AmountError::ArithmeticOverflow)?;
        let remaining = self.remaining_capacity();
        if requested > remaining {
            return Err(AmountError::BatchExceedsCapacity { requested, remaining }.into());
        }

        let mut allocation = self.allocation;
        let mut window = self.window.clone();
        let mut ops = Vec::with_capacity(amounts.len());
        let mut receipts = Vec::with_capacity(amounts.len());
        for (&beneficiary, &amount) in recipients.iter().zip(amounts) {
            let walk = pricing::walk_tokens(&self.table, &allocation, amount);
            allocation.advance(walk.granted, &self.table)?;
            let extended_to = self.extend_on_crossing(&mut window, walk.phase_before, walk.phase_after, now);
            ops.push(LedgerOp::Mint { to: beneficiary, amount: walk.granted });
            receipts.push(AssignmentReceipt {
                beneficiary,
                tokens: walk.granted,
                unassigned: walk.unassigned,
                phase: allocation.phase(),
                extended_to,
            });
        }

        self.ledger.apply(&self.config.parties.sale, &ops)?;

        self.allocation = allocation;
        self.window = window;
        info!(
            "batch assignment: {} entries, {} tokens (phase {})",
            receipts.len(),
            requested,
            allocation.phase()
        );
        Ok(receipts)
    }

    // ------------------------------------------------------------------
    // operator actions
    // ------------------------------------------------------------------

    /// Set the account that receives the team share. Once only.
    pub fn set_reserve_holder(&mut self, caller: Address, holder: Address) -> Result<(), SaleError> {
        self.ensure_operator(&caller)?;
        if self.reserve_holder.is_some() {
            return Err(StateError::ReserveHolderAlreadySet.into());
        }
        if holder.is_zero() {
            return Err(ConfigError::ZeroAddress("reserve holder").into());
        }
        self.reserve_holder = Some(holder);
        info!("reserve holder set to {}", holder);
        Ok(())
    }

    /// Clear the overflow record once the refund has been paid out.
    pub fn acknowledge_refund(&mut self, caller: Address) -> Result<Option<OverflowRecord>, SaleError> {
        self.ensure_operator(&caller)?;
        let settled = self.overflow.take();
        if let Some(record) = settled {
            info!("overflow of {} wei refunded to {}", record.amount, record.owner);
        }
        Ok(settled)
    }

    /// Close the sale for good and split the final supply.
    ///
    /// Mints the team share to the reserve holder and the platform share to
    /// the platform account, burns every other token held by the sale,
    /// finishes minting and hands ledger ownership to the treasury, all in a
    /// single atomic ledger batch.
    ///
    /// # Errors
    ///
    /// - [`AuthorizationError::NotOperator`] under [`FinalizePolicy::OperatorOnly`]
    /// - [`StateError::AlreadyFinalized`], [`StateError::ReserveHolderNotSet`]
    /// - [`StateError::NotFinalizable`] before closing unless sold out
    /// - [`SaleError::Ledger`] if any ledger operation fails
    pub fn finalize(&mut self, caller: Address) -> Result<FinalSplit, SaleError> {
        if self.window.is_finalized() {
            return Err(StateError::AlreadyFinalized.into());
        }
        if self.config.finalize_policy == FinalizePolicy::OperatorOnly {
            self.ensure_operator(&caller)?;
        }
        let reserve_holder = self.reserve_holder.ok_or(StateError::ReserveHolderNotSet)?;
        let now = self.now();
        if !self.is_sold_out() && !self.window.has_ended(now) {
            return Err(StateError::NotFinalizable { closing_time: self.window.closing_time(), now }.into());
        }

        let sold = self.allocation.total_allocated();
        let split = finalization::compute_split(sold, self.config.team_bps, self.config.platform_bps)?;
        let excess = self.ledger.total_supply().saturating_sub(sold);
        let parties = self.config.parties;
        let ops = finalization::plan_ledger_ops(&split, excess, reserve_holder, parties.platform, parties.treasury);
        debug!("finalize plan: {:?}", ops);

        let mut window = self.window.clone();
        window.mark_finalized(now)?;
        self.ledger.apply(&parties.sale, &ops)?;
        self.window = window;

        info!(
            "sale finalized: sold {} team {} platform {} burned {}",
            split.sold, split.team, split.platform, excess
        );
        Ok(FinalSplit { split, burned: excess, reserve_holder, finalized_at: now })
    }

    // ------------------------------------------------------------------
    // helpers
    // ------------------------------------------------------------------

    fn ensure_assigner(&self, caller: &Address) -> Result<(), AuthorizationError> {
        if *caller != self.config.parties.assigner {
            return Err(AuthorizationError::NotAssigner(*caller));
        }
        Ok(())
    }

    fn ensure_operator(&self, caller: &Address) -> Result<(), AuthorizationError> {
        if *caller != self.config.parties.operator {
            return Err(AuthorizationError::NotOperator(*caller));
        }
        Ok(())
    }

    fn extend_on_crossing(
        &self,
        window: &mut SaleWindow,
        phase_before: usize,
        phase_after: usize,
        now: Timestamp,
    ) -> Option<Timestamp> {
        for phase in phase_before + 1..=phase_after {
            debug!("tier threshold reached, phase {}", phase);
        }
        if !pricing::crosses_extension_phase(phase_before, phase_after) {
            return None;
        }
        let extended = window.extend(now, self.config.grace_period_secs);
        if let Some(closing) = extended {
            info!("closing time extended to {}", closing);
        }
        extended
    }
}
