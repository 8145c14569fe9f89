//! Sale schedule: when purchases and assignments are accepted.
//!
//! The closing time only moves forward, once, through [`SaleWindow::extend`],
//! and never past the absolute maximum. Finalization is recorded here as well
//! so that every eligibility check reads one place.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StateError, WindowError};
use crate::types::Timestamp;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SaleWindow {
    opening_time: Timestamp,
    assign_opening_time: Timestamp,
    closing_time: Timestamp,
    absolute_max_closing_time: Timestamp,
    extended: bool,
    finalized_at: Option<Timestamp>,
}

impl SaleWindow {
    /// Build a window, requiring `assign_opening <= opening < closing <= absolute_max`.
    pub fn new(
        opening_time: Timestamp,
        assign_opening_time: Timestamp,
        closing_time: Timestamp,
        absolute_max_closing_time: Timestamp,
    ) -> Result<Self, ConfigError> {
        let window = Self {
            opening_time,
            assign_opening_time,
            closing_time,
            absolute_max_closing_time,
            extended: false,
            finalized_at: None,
        };
        window.validate()?;
        Ok(window)
    }

    /// Check the schedule ordering. Used for freshly built and restored windows.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assign_opening_time > self.opening_time {
            return Err(ConfigError::InvalidSchedule(
                "assignment opens after the public sale".into(),
            ));
        }
        if self.closing_time <= self.opening_time {
            return Err(ConfigError::InvalidSchedule("closing not after opening".into()));
        }
        if self.absolute_max_closing_time < self.closing_time {
            return Err(ConfigError::InvalidSchedule(
                "absolute max closing before closing".into(),
            ));
        }
        Ok(())
    }

    pub fn opening_time(&self) -> Timestamp {
        self.opening_time
    }

    pub fn assign_opening_time(&self) -> Timestamp {
        self.assign_opening_time
    }

    pub fn closing_time(&self) -> Timestamp {
        self.closing_time
    }

    pub fn absolute_max_closing_time(&self) -> Timestamp {
        self.absolute_max_closing_time
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }

    pub fn finalized_at(&self) -> Option<Timestamp> {
        self.finalized_at
    }

    /// `opening_time <= now < closing_time` and not finalized.
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.opening_time <= now && now < self.closing_time && !self.is_finalized()
    }

    /// Whether the closing time has passed.
    pub fn has_ended(&self, now: Timestamp) -> bool {
        now >= self.closing_time
    }

    /// Eligibility for public purchases.
    pub fn ensure_open(&self, now: Timestamp) -> Result<(), WindowError> {
        if self.is_finalized() {
            return Err(WindowError::Finalized);
        }
        if now < self.opening_time {
            return Err(WindowError::NotOpenYet { opens_at: self.opening_time, now });
        }
        if self.has_ended(now) {
            return Err(WindowError::Closed { closed_at: self.closing_time, now });
        }
        Ok(())
    }

    /// Eligibility for assigner allocations: from the assignment date until closing.
    pub fn ensure_assignable(&self, now: Timestamp) -> Result<(), WindowError> {
        if self.is_finalized() {
            return Err(WindowError::Finalized);
        }
        if now < self.assign_opening_time {
            return Err(WindowError::AssignmentNotOpen { opens_at: self.assign_opening_time, now });
        }
        if self.has_ended(now) {
            return Err(WindowError::Closed { closed_at: self.closing_time, now });
        }
        Ok(())
    }

    /// Push the closing time to `now + grace`, clamped to the absolute maximum.
    ///
    /// Only the first call has any effect. Returns the new closing time when
    /// it moved.
    pub fn extend(&mut self, now: Timestamp, grace_secs: u64) -> Option<Timestamp> {
        if self.extended {
            return None;
        }
        self.extended = true;
        let target = now
            .saturating_add(grace_secs)
            .max(self.closing_time)
            .min(self.absolute_max_closing_time);
        if target > self.closing_time {
            self.closing_time = target;
            Some(target)
        } else {
            None
        }
    }

    /// Record the terminal transition.
    pub fn mark_finalized(&mut self, now: Timestamp) -> Result<(), StateError> {
        if self.is_finalized() {
            return Err(StateError::AlreadyFinalized);
        }
        self.finalized_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> SaleWindow {
        SaleWindow::new(1_000, 500, 2_000, 3_000).unwrap()
    }

    // ------------------------------------------------------------------
    // construction
    // ------------------------------------------------------------------

    #[test]
    fn rejects_assignment_after_opening() {
        assert!(SaleWindow::new(1_000, 1_001, 2_000, 3_000).is_err());
    }

    #[test]
    fn rejects_empty_window() {
        assert!(SaleWindow::new(1_000, 1_000, 1_000, 3_000).is_err());
    }

    #[test]
    fn rejects_max_before_closing() {
        assert!(SaleWindow::new(1_000, 1_000, 2_000, 1_999).is_err());
    }

    // ------------------------------------------------------------------
    // eligibility
    // ------------------------------------------------------------------

    #[test]
    fn open_bounds() {
        let w = window();
        assert!(!w.is_open(999));
        assert!(w.is_open(1_000));
        assert!(w.is_open(1_999));
        assert!(!w.is_open(2_000));
    }

    #[test]
    fn ensure_open_errors() {
        let w = window();
        assert_eq!(
            w.ensure_open(10),
            Err(WindowError::NotOpenYet { opens_at: 1_000, now: 10 })
        );
        assert_eq!(
            w.ensure_open(2_000),
            Err(WindowError::Closed { closed_at: 2_000, now: 2_000 })
        );
        assert!(w.ensure_open(1_500).is_ok());
    }

    #[test]
    fn assignment_opens_early() {
        let w = window();
        assert!(w.ensure_assignable(500).is_ok());
        assert_eq!(
            w.ensure_assignable(499),
            Err(WindowError::AssignmentNotOpen { opens_at: 500, now: 499 })
        );
        assert!(w.ensure_assignable(2_000).is_err());
    }

    #[test]
    fn finalized_closes_everything() {
        let mut w = window();
        w.mark_finalized(1_500).unwrap();
        assert!(!w.is_open(1_500));
        assert_eq!(w.ensure_open(1_500), Err(WindowError::Finalized));
        assert_eq!(w.ensure_assignable(1_500), Err(WindowError::Finalized));
        assert_eq!(w.finalized_at(), Some(1_500));
    }

    #[test]
    fn finalize_twice_fails() {
        let mut w = window();
        w.mark_finalized(2_100).unwrap();
        assert_eq!(w.mark_finalized(2_200), Err(StateError::AlreadyFinalized));
        assert_eq!(w.finalized_at(), Some(2_100));
    }

    // ------------------------------------------------------------------
    // extension
    // ------------------------------------------------------------------

    #[test]
    fn extend_moves_forward() {
        let mut w = window();
        assert_eq!(w.extend(1_900, 500), Some(2_400));
        assert_eq!(w.closing_time(), 2_400);
    }

    #[test]
    fn extend_clamped_to_max() {
        let mut w = window();
        assert_eq!(w.extend(1_900, 5_000), Some(3_000));
        assert_eq!(w.closing_time(), 3_000);
    }

    #[test]
    fn extend_never_moves_back() {
        let mut w = window();
        assert_eq!(w.extend(1_100, 100), None);
        assert_eq!(w.closing_time(), 2_000);
        assert!(w.is_extended());
    }

    #[test]
    fn extend_fires_once() {
        let mut w = window();
        assert_eq!(w.extend(1_900, 200), Some(2_100));
        assert_eq!(w.extend(2_050, 500), None);
        assert_eq!(w.closing_time(), 2_100);
    }
}
