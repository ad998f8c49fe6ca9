//! Rolling daily withdrawal allowance
//!
//! Transfers within the allowance bypass the confirmation threshold. The
//! allowance window restarts at the first spend made one day or more after
//! the previous window began.

use crate::core::amount::{wei_string, Wei};
use crate::multisig::wallet::MultisigError;
use serde::{Deserialize, Serialize};

/// Length of a spending window in seconds
pub const ONE_DAY: u64 = 86_400;

/// Spending state of a wallet's daily limit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyLimitTracker {
    #[serde(with = "wei_string")]
    limit: Wei,
    #[serde(with = "wei_string")]
    spent_today: Wei,
    /// Start of the current window
    last_day: u64,
}

impl DailyLimitTracker {
    pub fn new(limit: Wei) -> Self {
        Self {
            limit,
            spent_today: 0,
            last_day: 0,
        }
    }

    pub fn limit(&self) -> Wei {
        self.limit
    }

    /// Amount recorded in the current window
    pub fn spent_today(&self) -> Wei {
        self.spent_today
    }

    pub fn last_day(&self) -> u64 {
        self.last_day
    }

    /// Whether a full day has passed since the window started
    pub fn window_elapsed(&self, now: u64) -> bool {
        now >= self.last_day.saturating_add(ONE_DAY)
    }

    /// Amount that can still be withdrawn without confirmations
    pub fn calc_max_withdraw(&self, now: u64) -> Wei {
        if self.window_elapsed(now) {
            return self.limit;
        }
        self.limit.saturating_sub(self.spent_today)
    }

    /// Whether `amount` fits in the remaining allowance
    pub fn is_under_limit(&self, amount: Wei, now: u64) -> bool {
        let spent = if self.window_elapsed(now) {
            0
        } else {
            self.spent_today
        };
        spent
            .checked_add(amount)
            .is_some_and(|total| total <= self.limit)
    }

    /// Charge a withdrawal against the allowance, starting a new window if due
    pub fn record_spend(&mut self, amount: Wei, now: u64) -> Result<(), MultisigError> {
        if !self.is_under_limit(amount, now) {
            return Err(MultisigError::LimitExceeded {
                requested: amount,
                available: self.calc_max_withdraw(now),
            });
        }

        if self.window_elapsed(now) {
            self.last_day = now;
            self.spent_today = 0;
        }
        self.spent_today += amount;
        Ok(())
    }

    /// Set a new limit, keeping what was already spent today
    pub fn change_limit(&mut self, limit: Wei) {
        self.limit = limit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ether;

    const START: u64 = 1_700_000_000;

    #[test]
    fn test_fresh_tracker_has_full_allowance() {
        let tracker = DailyLimitTracker::new(ether(3));

        assert_eq!(tracker.calc_max_withdraw(START), ether(3));
        assert!(tracker.is_under_limit(ether(3), START));
        assert!(!tracker.is_under_limit(ether(3) + 1, START));
    }

    #[test]
    fn test_record_spend_opens_window() {
        let mut tracker = DailyLimitTracker::new(ether(3));

        tracker.record_spend(ether(2), START).unwrap();
        assert_eq!(tracker.last_day(), START);
        assert_eq!(tracker.spent_today(), ether(2));
        assert_eq!(tracker.calc_max_withdraw(START + 10), ether(1));

        assert!(matches!(
            tracker.record_spend(ether(2), START + 10),
            Err(MultisigError::LimitExceeded { .. })
        ));
        assert_eq!(tracker.spent_today(), ether(2));
    }

    #[test]
    fn test_calc_max_withdraw_is_pure() {
        let mut tracker = DailyLimitTracker::new(ether(3));
        tracker.record_spend(ether(3), START).unwrap();

        let later = START + ONE_DAY + 1;
        assert_eq!(tracker.calc_max_withdraw(later), ether(3));
        assert_eq!(tracker.calc_max_withdraw(later), ether(3));
        assert_eq!(tracker.spent_today(), ether(3));
        assert_eq!(tracker.last_day(), START);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut tracker = DailyLimitTracker::new(ether(1));
        tracker.record_spend(ether(1), START).unwrap();

        assert!(!tracker.window_elapsed(START + ONE_DAY - 1));
        assert_eq!(tracker.calc_max_withdraw(START + ONE_DAY - 1), 0);
        assert!(tracker.window_elapsed(START + ONE_DAY));
        assert_eq!(tracker.calc_max_withdraw(START + ONE_DAY), ether(1));
    }

    #[test]
    fn test_spend_after_reset() {
        let mut tracker = DailyLimitTracker::new(ether(3));
        tracker.record_spend(ether(3), START).unwrap();

        let later = START + ONE_DAY + 1;
        tracker.record_spend(ether(1), later).unwrap();
        assert_eq!(tracker.last_day(), later);
        assert_eq!(tracker.spent_today(), ether(1));
    }

    #[test]
    fn test_lowered_limit_floors_at_zero() {
        let mut tracker = DailyLimitTracker::new(ether(3));
        tracker.record_spend(ether(2), START).unwrap();

        tracker.change_limit(ether(1));
        assert_eq!(tracker.limit(), ether(1));
        assert_eq!(tracker.spent_today(), ether(2));
        assert_eq!(tracker.calc_max_withdraw(START + 1), 0);
        assert!(!tracker.is_under_limit(1, START + 1));

        // Next window restores the (new) full allowance
        assert_eq!(tracker.calc_max_withdraw(START + ONE_DAY), ether(1));
    }

    #[test]
    fn test_overflow_is_not_under_limit() {
        let mut tracker = DailyLimitTracker::new(Wei::MAX);
        tracker.record_spend(10, START).unwrap();
        assert!(!tracker.is_under_limit(Wei::MAX, START + 1));
    }
}
