//! Time sources.
//!
//! Production sales read the system clock. Tests drive a [`ManualClock`]
//! through `Crowdsale::with_clock`; the manual clock is only compiled under
//! test or with the `testing` feature.

use hardcap_core::types::Timestamp;

/// Seconds since the Unix epoch, saturating to zero if the clock is before it.
pub fn system_now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(any(test, feature = "testing"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "testing"))]
mod manual {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use hardcap_core::types::Timestamp;

    /// A shared, hand-driven clock.
    ///
    /// Clones observe the same time, so a test can keep one handle and give
    /// another to the sale.
    #[derive(Clone, Debug, Default)]
    pub struct ManualClock {
        now: Arc<AtomicU64>,
    }

    impl ManualClock {
        pub fn new(start: Timestamp) -> Self {
            Self { now: Arc::new(AtomicU64::new(start)) }
        }

        pub fn now(&self) -> Timestamp {
            self.now.load(Ordering::SeqCst)
        }

        pub fn set(&self, now: Timestamp) {
            self.now.store(now, Ordering::SeqCst);
        }

        pub fn advance(&self, secs: u64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }

        /// A closure reading this clock, for `Crowdsale::with_clock`.
        pub fn source(&self) -> impl Fn() -> Timestamp + Send + Sync + use<> {
            let now = Arc::clone(&self.now);
            move || now.load(Ordering::SeqCst)
        }
    }
}
