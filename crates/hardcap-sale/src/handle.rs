//! Shared access to a running sale.
//!
//! Every sale operation is a read-modify-write over the whole state, so the
//! handle serializes them behind one mutex. Readers take the same lock and
//! always observe a committed state.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use hardcap_core::error::SaleError;
use hardcap_core::traits::CreditLedger;
use hardcap_core::types::{Address, Amount, OverflowRecord};

use crate::finalization::FinalSplit;
use crate::sale::{AssignmentReceipt, Crowdsale, PurchaseReceipt, SaleSnapshot};

/// Cloneable handle to a [`Crowdsale`].
pub struct SaleHandle<L> {
    inner: Arc<Mutex<Crowdsale<L>>>,
}

impl<L> Clone for SaleHandle<L> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<L: CreditLedger> SaleHandle<L> {
    pub fn new(sale: Crowdsale<L>) -> Self {
        Self { inner: Arc::new(Mutex::new(sale)) }
    }

    /// Lock the sale for a sequence of reads.
    pub fn lock(&self) -> MutexGuard<'_, Crowdsale<L>> {
        self.inner.lock()
    }

    pub fn receive_payment(&self, sender: Address, wei: Amount) -> Result<PurchaseReceipt, SaleError> {
        self.inner.lock().receive_payment(sender, wei)
    }

    pub fn buy_tokens(
        &self,
        purchaser: Address,
        beneficiary: Address,
        wei: Amount,
    ) -> Result<PurchaseReceipt, SaleError> {
        self.inner.lock().buy_tokens(purchaser, beneficiary, wei)
    }

    pub fn assign(&self, caller: Address, beneficiary: Address, tokens: Amount) -> Result<AssignmentReceipt, SaleError> {
        self.inner.lock().assign(caller, beneficiary, tokens)
    }

    pub fn assign_batch(
        &self,
        caller: Address,
        recipients: &[Address],
        amounts: &[Amount],
    ) -> Result<Vec<AssignmentReceipt>, SaleError> {
        self.inner.lock().assign_batch(caller, recipients, amounts)
    }

    pub fn set_reserve_holder(&self, caller: Address, holder: Address) -> Result<(), SaleError> {
        self.inner.lock().set_reserve_holder(caller, holder)
    }

    pub fn finalize(&self, caller: Address) -> Result<FinalSplit, SaleError> {
        self.inner.lock().finalize(caller)
    }

    pub fn acknowledge_refund(&self, caller: Address) -> Result<Option<OverflowRecord>, SaleError> {
        self.inner.lock().acknowledge_refund(caller)
    }

    pub fn snapshot(&self) -> SaleSnapshot {
        self.inner.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use hardcap_core::config::{SaleConfig, SaleParties};
    use hardcap_core::constants::{ETHER, TOKEN};
    use hardcap_core::ledger::MemoryCreditLedger;
    use std::thread;

    const SALE: Address = Address::repeat_byte(0x05);

    fn handle() -> SaleHandle<MemoryCreditLedger> {
        let parties = SaleParties {
            treasury: Address::repeat_byte(0x01),
            platform: Address::repeat_byte(0x02),
            assigner: Address::repeat_byte(0x03),
            operator: Address::repeat_byte(0x04),
            sale: SALE,
        };
        let clock = ManualClock::new(1_000);
        let sale = Crowdsale::with_clock(
            SaleConfig::new(parties, 1_000),
            MemoryCreditLedger::new(SALE),
            clock.source(),
        )
        .unwrap();
        SaleHandle::new(sale)
    }

    #[test]
    fn concurrent_purchases_never_exceed_cap() {
        let h = handle();
        let threads: Vec<_> = (0..8u8)
            .map(|i| {
                let h = h.clone();
                thread::spawn(move || {
                    let buyer = Address::repeat_byte(0x20 + i);
                    // 8 x 5 x 1,000 ether is well past the cap.
                    for _ in 0..5 {
                        let _ = h.receive_payment(buyer, 1_000 * ETHER);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let sale = h.lock();
        assert!(sale.is_sold_out());
        assert_eq!(sale.ledger().total_supply(), sale.total_allocated());
        assert_eq!(sale.total_allocated(), 250_000_000 * TOKEN);
    }

    #[test]
    fn clones_share_state() {
        let h = handle();
        let other = h.clone();
        h.receive_payment(Address::repeat_byte(0x30), ETHER).unwrap();
        assert_eq!(other.snapshot().allocation.total_allocated(), 11_500 * TOKEN);
    }
}
